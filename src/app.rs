//! Application-level wiring for the CLI: config file merge, image I/O and
//! the optional intermediate dumps around [`StereoPipeline`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::backend::ComputeBackend;
use crate::io::{load_rgba, save_gray};
use crate::params::StereoParams;
use crate::pipeline::{StereoOutput, StereoPipeline};
use crate::report::LogReporter;

/// A run description. Every field is optional so a JSON file and the command
/// line can each provide a part of it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub left: Option<PathBuf>,
    pub right: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub dump_dir: Option<PathBuf>,
    pub normalize: Option<bool>,
    pub window_size: Option<usize>,
    pub downscale_factor: Option<u32>,
    pub max_disparity: Option<u32>,
    pub cross_check_threshold: Option<u32>,
    pub occlusion_search_radius: Option<usize>,
    pub invert_second_pass: Option<bool>,
    pub threads: Option<usize>,
    pub log_level: Option<String>,
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Fields set in `other` win over fields set in `self`.
    pub fn merge(self, other: RunConfig) -> RunConfig {
        RunConfig {
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            output: other.output.or(self.output),
            dump_dir: other.dump_dir.or(self.dump_dir),
            normalize: other.normalize.or(self.normalize),
            window_size: other.window_size.or(self.window_size),
            downscale_factor: other.downscale_factor.or(self.downscale_factor),
            max_disparity: other.max_disparity.or(self.max_disparity),
            cross_check_threshold: other.cross_check_threshold.or(self.cross_check_threshold),
            occlusion_search_radius: other
                .occlusion_search_radius
                .or(self.occlusion_search_radius),
            invert_second_pass: other.invert_second_pass.or(self.invert_second_pass),
            threads: other.threads.or(self.threads),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn params(&self) -> StereoParams {
        let mut p = StereoParams::default();
        if let Some(v) = self.window_size {
            p.window_size = v;
        }
        if let Some(v) = self.downscale_factor {
            p.downscale_factor = v;
        }
        if let Some(v) = self.max_disparity {
            p.max_disparity = v;
        }
        if let Some(v) = self.cross_check_threshold {
            p.cross_check_threshold = v;
        }
        if let Some(v) = self.occlusion_search_radius {
            p.occlusion_search_radius = v;
        }
        if let Some(v) = self.invert_second_pass {
            p.invert_second_pass = v;
        }
        if let Some(v) = self.threads {
            p.threads = v;
        }
        p
    }
}

fn dump_intermediates(dir: &Path, out: &StereoOutput) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    save_gray(dir.join("disparity_left.png"), &out.left.to_luma())?;
    save_gray(dir.join("disparity_right.png"), &out.right.to_luma())?;
    save_gray(dir.join("cross_checked.png"), &out.cross_checked.to_luma())?;
    Ok(())
}

/// Loads the pair, runs the pipeline and writes the disparity image.
pub fn run_stereo(cfg: RunConfig) -> Result<StereoOutput> {
    let left_path = cfg.left.clone().context("no left image given")?;
    let right_path = cfg.right.clone().context("no right image given")?;
    let output = cfg
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("out.png"));
    let left = load_rgba(&left_path)?;
    let right = load_rgba(&right_path)?;

    let pipeline = StereoPipeline::new(cfg.params())?;
    info!("number of worker threads = {}", pipeline.backend().threads());
    info!("window size = {}", pipeline.params().window_size);

    let result = pipeline.run(&left, &right, &mut LogReporter)?;
    save_gray(&output, &result.to_image(cfg.normalize.unwrap_or(false)))?;
    if let Some(dir) = &cfg.dump_dir {
        dump_intermediates(dir, &result)?;
    }
    Ok(result)
}
