//! Image file decode/encode.

use std::path::Path;

use image::{GrayImage, RgbaImage};
use log::{error, info};

use crate::error::{Result, StereoError};

/// Decodes any format the `image` crate understands into 8-bit RGBA.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path = path.as_ref();
    match image::open(path) {
        Ok(img) => {
            info!("loading '{}' was successful", path.display());
            Ok(img.to_rgba8())
        }
        Err(source) => {
            error!("decoder error for '{}': {}", path.display(), source);
            Err(StereoError::Decode {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Writes a single-channel 8-bit image; the format follows the extension.
pub fn save_gray<P: AsRef<Path>>(path: P, img: &GrayImage) -> Result<()> {
    let path = path.as_ref();
    match img.save(path) {
        Ok(()) => {
            info!("successfully saved file: {}", path.display());
            Ok(())
        }
        Err(source) => {
            error!("encoder error for '{}': {}", path.display(), source);
            Err(StereoError::Encode {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
