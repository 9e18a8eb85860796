//! The full stereo pipeline: downscale, window statistics, two disparity
//! passes, cross-check and occlusion fill.
//!
//! Every stage is dispatched through a [`ComputeBackend`] and completes before
//! the next one starts. Each stage borrows its inputs and hands back a newly
//! owned grid.

use image::{GrayImage, RgbaImage};
use log::{info, warn};

use crate::backend::{ComputeBackend, RayonBackend};
use crate::cross_check::cross_check;
use crate::disparity::DisparityMap;
use crate::error::{BackendError, Result, StereoError};
use crate::matcher::{match_disparity, PreparedImage, SearchDirection};
use crate::occlusion::fill_occlusions;
use crate::params::StereoParams;
use crate::preprocess::downscale_gray;
use crate::report::{Stage, StageReporter};
use crate::stats::window_stats;

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct StereoOutput {
    /// Final left-referenced map after cross-check and occlusion fill.
    pub disparity: DisparityMap,
    pub left: DisparityMap,
    pub right: DisparityMap,
    pub cross_checked: DisparityMap,
    /// Pixels rejected by the cross-check (including pixels that were
    /// already invalid after matching).
    pub invalidated: usize,
    /// Pixels the occlusion filler could not repair; exported as 0.
    pub unfilled: usize,
    pub max_disparity: u32,
}

impl StereoOutput {
    /// The deliverable 8-bit image: raw disparity bytes, or stretched to the
    /// full range when `normalize` is set.
    pub fn to_image(&self, normalize: bool) -> GrayImage {
        if normalize {
            self.disparity.to_luma_normalised(self.max_disparity)
        } else {
            self.disparity.to_luma()
        }
    }
}

pub struct StereoPipeline<B = RayonBackend> {
    params: StereoParams,
    backend: B,
}

impl StereoPipeline<RayonBackend> {
    /// Pipeline on a rayon pool with `params.threads` workers.
    pub fn new(params: StereoParams) -> Result<Self> {
        params.validate()?;
        let backend = RayonBackend::new(params.threads)?;
        Ok(Self::with_backend(params, backend))
    }
}

impl<B: ComputeBackend> StereoPipeline<B> {
    pub fn with_backend(params: StereoParams, backend: B) -> Self {
        StereoPipeline { params, backend }
    }

    pub fn params(&self) -> &StereoParams {
        &self.params
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn run_stage<T, F>(
        &self,
        reporter: &mut dyn StageReporter,
        stage: Stage,
        dims: (usize, usize),
        f: F,
    ) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        let mut job = Some(f);
        let mut out = None;
        reporter.stage_started(stage, dims.0, dims.1);
        let elapsed = self.backend.dispatch(stage, dims, &mut || {
            if let Some(f) = job.take() {
                out = Some(f());
            }
        })?;
        reporter.stage_finished(stage, elapsed);
        out.ok_or(StereoError::ComputeBackend(BackendError::NotExecuted { stage }))
    }

    /// Computes the left-referenced disparity map of a rectified RGBA pair.
    ///
    /// Any failure aborts the whole run; no partial map is returned.
    pub fn run(
        &self,
        left: &RgbaImage,
        right: &RgbaImage,
        reporter: &mut dyn StageReporter,
    ) -> Result<StereoOutput> {
        let p = self.params;
        p.validate()?;
        if left.dimensions() != right.dimensions() {
            return Err(StereoError::InputDimensionMismatch {
                left: left.dimensions(),
                right: right.dimensions(),
            });
        }
        let (w, h) = left.dimensions();
        if w < p.downscale_factor || h < p.downscale_factor {
            return Err(StereoError::InvalidInput(format!(
                "image {}x{} is smaller than the downscale factor {}",
                w, h, p.downscale_factor
            )));
        }
        let dims = (
            (w / p.downscale_factor) as usize,
            (h / p.downscale_factor) as usize,
        );
        p.validate_for_width(dims.0)?;

        info!(
            "computing {}x{} disparity on {}: window size = {}, max disparity = {}",
            dims.0,
            dims.1,
            self.backend.name(),
            p.window_size,
            p.max_disparity
        );

        let gray_l = self.run_stage(reporter, Stage::Downscale, dims, || {
            downscale_gray(left, p.downscale_factor)
        })??;
        let gray_r = self.run_stage(reporter, Stage::Downscale, dims, || {
            downscale_gray(right, p.downscale_factor)
        })??;

        let stats_l = self.run_stage(reporter, Stage::WindowStats, dims, || {
            window_stats(&gray_l, p.window_size)
        })?;
        let stats_r = self.run_stage(reporter, Stage::WindowStats, dims, || {
            window_stats(&gray_r, p.window_size)
        })?;
        let prep_l = PreparedImage::from_parts(gray_l, stats_l);
        let prep_r = PreparedImage::from_parts(gray_r, stats_r);

        let first = SearchDirection::Negative;
        let second = if p.invert_second_pass {
            first.inverted()
        } else {
            first
        };
        let disp_l = self.run_stage(reporter, Stage::MatchLeft, dims, || {
            match_disparity(&prep_l, &prep_r, first, p.max_disparity, p.window_size)
        })??;
        let disp_r = self.run_stage(reporter, Stage::MatchRight, dims, || {
            match_disparity(&prep_r, &prep_l, second, p.max_disparity, p.window_size)
        })??;

        let checked = self.run_stage(reporter, Stage::CrossCheck, dims, || {
            cross_check(&disp_l, &disp_r, p.cross_check_threshold)
        })??;
        let invalidated = checked.invalid_count();

        let filled = self.run_stage(reporter, Stage::OcclusionFill, dims, || {
            fill_occlusions(&checked, p.occlusion_search_radius)
        })?;
        let unfilled = filled.invalid_count();

        info!(
            "cross check rejected {} of {} pixels",
            invalidated,
            dims.0 * dims.1
        );
        if unfilled > 0 {
            warn!(
                "{} pixels have no valid neighbour within {} columns, written as 0",
                unfilled, p.occlusion_search_radius
            );
        }

        Ok(StereoOutput {
            disparity: filled,
            left: disp_l,
            right: disp_r,
            cross_checked: checked,
            invalidated,
            unfilled,
            max_disparity: p.max_disparity,
        })
    }
}
