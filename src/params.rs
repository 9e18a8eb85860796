//! Configuration constants shared by every stage of one run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StereoError};

/// Parameters of the ZNCC block matcher and its post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StereoParams {
    /// Side of the square matching window. Must be odd.
    pub window_size: usize,
    /// Integer decimation factor applied to both input images.
    pub downscale_factor: u32,
    /// Largest disparity searched, in downscaled pixels.
    pub max_disparity: u32,
    /// Largest tolerated |dL - dR| in the left-right check.
    pub cross_check_threshold: u32,
    /// How far along a row the occlusion filler looks for a valid pixel.
    pub occlusion_search_radius: usize,
    /// Search the right-referenced pass in the mirrored direction.
    pub invert_second_pass: bool,
    /// Worker threads for the compute backend, 0 lets rayon decide.
    pub threads: usize,
}

impl Default for StereoParams {
    fn default() -> Self {
        Self {
            window_size: 9,
            downscale_factor: 4,
            max_disparity: 65,
            cross_check_threshold: 8,
            occlusion_search_radius: 50,
            invert_second_pass: true,
            threads: 0,
        }
    }
}

impl StereoParams {
    /// Checks the constraints that do not depend on the image size.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(StereoError::InvalidParams(format!(
                "window size must be odd, got {}",
                self.window_size
            )));
        }
        if self.downscale_factor == 0 {
            return Err(StereoError::InvalidParams(
                "downscale factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks `max_disparity` against the width of the reference grid.
    pub fn validate_for_width(&self, width: usize) -> Result<()> {
        self.validate()?;
        if self.max_disparity as usize > width {
            return Err(StereoError::InvalidParams(format!(
                "max disparity {} exceeds grid width {}",
                self.max_disparity, width
            )));
        }
        Ok(())
    }
}
