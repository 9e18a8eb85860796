use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use zncc_stereo::app::{run_stereo, RunConfig};

#[derive(Parser)]
#[command(name = "zncc-stereo")]
#[command(about = "Dense disparity from a rectified stereo pair (ZNCC block matching)")]
#[command(version)]
struct Cli {
    /// Left image of the rectified pair.
    #[arg(long)]
    left: Option<PathBuf>,

    /// Right image of the rectified pair.
    #[arg(long)]
    right: Option<PathBuf>,

    /// Output disparity image (defaults to out.png).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// JSON file with any subset of the run options; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the raw left/right and cross-checked maps here.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Stretch disparities to 0..255 instead of writing raw values.
    #[arg(long)]
    normalize: bool,

    /// Odd side length of the matching window.
    #[arg(long)]
    window_size: Option<usize>,

    /// Integer downscale factor applied to both inputs.
    #[arg(long)]
    downscale_factor: Option<u32>,

    /// Largest disparity searched, in downscaled pixels.
    #[arg(long)]
    max_disparity: Option<u32>,

    /// Largest tolerated left-right disagreement.
    #[arg(long)]
    cross_check_threshold: Option<u32>,

    /// Row search radius of the occlusion filler.
    #[arg(long)]
    occlusion_search_radius: Option<usize>,

    /// Run the right-referenced pass in the same direction as the left one.
    #[arg(long)]
    no_invert_second_pass: bool,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// Log filter when RUST_LOG is not set.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let file = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };
        let cli = RunConfig {
            left: self.left,
            right: self.right,
            output: self.output,
            dump_dir: self.dump_dir,
            normalize: self.normalize.then_some(true),
            window_size: self.window_size,
            downscale_factor: self.downscale_factor,
            max_disparity: self.max_disparity,
            cross_check_threshold: self.cross_check_threshold,
            occlusion_search_radius: self.occlusion_search_radius,
            invert_second_pass: self.no_invert_second_pass.then_some(false),
            threads: self.threads,
            log_level: self.log_level,
        };
        Ok(file.merge(cli))
    }
}

fn main() -> Result<()> {
    let cfg = Cli::parse().into_config()?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    log::info!("Starting zncc-stereo v{}", env!("CARGO_PKG_VERSION"));
    let out = run_stereo(cfg)?;
    log::info!(
        "done: {} pixels failed the cross check, {} left unfilled",
        out.invalidated,
        out.unfilled
    );
    Ok(())
}
