//! Dense disparity from a rectified stereo pair with window-based ZNCC block
//! matching, a left-right cross-check and occlusion filling.

extern crate image;
extern crate ndarray;

pub mod app;
pub mod backend;
pub mod cross_check;
pub mod disparity;
pub mod error;
pub mod io;
pub mod matcher;
pub mod occlusion;
pub mod params;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod stats;

pub use disparity::DisparityMap;
pub use error::{BackendError, Result, StereoError};
pub use params::StereoParams;
pub use pipeline::{StereoOutput, StereoPipeline};

use image::{GrayImage, RgbaImage};

/// Computes the final 8-bit disparity image of a rectified RGBA pair with the
/// default rayon backend, logging stage timings.
pub fn compute_disp(
    left: &RgbaImage,
    right: &RgbaImage,
    params: StereoParams,
) -> Result<GrayImage> {
    let pipeline = StereoPipeline::new(params)?;
    let out = pipeline.run(left, right, &mut report::LogReporter)?;
    Ok(out.to_image(false))
}
