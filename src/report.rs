//! Stage timing and progress reporting.
//!
//! A reporter is handed to the pipeline instead of living in global state, so
//! several runs can report independently (or not at all).

use std::fmt;
use std::time::Duration;

use log::{debug, info};

/// The grid operations dispatched by one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Downscale,
    WindowStats,
    MatchLeft,
    MatchRight,
    CrossCheck,
    OcclusionFill,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Downscale => "downscale",
            Stage::WindowStats => "window statistics",
            Stage::MatchLeft => "left-referenced disparity",
            Stage::MatchRight => "right-referenced disparity",
            Stage::CrossCheck => "cross check",
            Stage::OcclusionFill => "occlusion fill",
        };
        f.write_str(name)
    }
}

pub trait StageReporter {
    /// Called right before a stage is dispatched over a `width`x`height` grid.
    fn stage_started(&mut self, stage: Stage, width: usize, height: usize);

    /// Called once the stage's output grid is complete.
    fn stage_finished(&mut self, stage: Stage, elapsed: Duration);
}

/// Reports through the `log` facade.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StageReporter for LogReporter {
    fn stage_started(&mut self, stage: Stage, width: usize, height: usize) {
        debug!("=== starting {} over {}x{}", stage, width, height);
    }

    fn stage_finished(&mut self, stage: Stage, elapsed: Duration) {
        info!(
            "{} finished in {:.3} ms",
            stage,
            elapsed.as_secs_f64() * 1e3
        );
    }
}

#[derive(Debug, Default)]
pub struct NullReporter;

impl StageReporter for NullReporter {
    fn stage_started(&mut self, _stage: Stage, _width: usize, _height: usize) {}

    fn stage_finished(&mut self, _stage: Stage, _elapsed: Duration) {}
}
