//! Integer disparity maps with an explicit invalid marker.

use image::{GrayImage, Luma};
use ndarray::Array2;

/// A disparity map indexed `[(y, x)]`. `None` marks a pixel without a
/// trusted disparity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisparityMap {
    data: Array2<Option<u32>>,
}

impl DisparityMap {
    pub fn new(width: usize, height: usize) -> Self {
        DisparityMap {
            data: Array2::from_elem((height, width), None),
        }
    }

    pub fn from_array(data: Array2<Option<u32>>) -> Self {
        DisparityMap { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        self.data[(y, x)]
    }

    pub fn as_array(&self) -> &Array2<Option<u32>> {
        &self.data
    }

    pub fn invalid_count(&self) -> usize {
        self.data.iter().filter(|d| d.is_none()).count()
    }

    /// Converts to an 8-bit image: one byte per pixel equal to the disparity,
    /// clipped to 255. Invalid pixels become 0.
    pub fn to_luma(&self) -> GrayImage {
        self.to_luma_with(|d| d.min(255) as u8)
    }

    /// Converts to an 8-bit image stretched so that `max_disp` maps to 255.
    ///
    /// If `max_disp` is zero the function is equivalent to `.to_luma()`.
    pub fn to_luma_normalised(&self, max_disp: u32) -> GrayImage {
        if max_disp == 0 {
            return self.to_luma();
        }
        let mult = 255.0 / max_disp as f32;
        self.to_luma_with(|d| (d as f32 * mult).clamp(0.0, 255.0) as u8)
    }

    fn to_luma_with<F: Fn(u32) -> u8>(&self, f: F) -> GrayImage {
        let mut out = GrayImage::new(self.width() as u32, self.height() as u32);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let v = self.data[(y as usize, x as usize)].map_or(0, &f);
            *pixel = Luma([v]);
        }
        out
    }
}
