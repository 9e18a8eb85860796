use std::path::PathBuf;

use thiserror::Error;

use crate::report::Stage;

pub type Result<T> = std::result::Result<T, StereoError>;

#[derive(Error, Debug)]
pub enum StereoError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid parameter(s): {0}")]
    InvalidParams(String),
    #[error("input image dimensions should match: left {left:?}, right {right:?}")]
    InputDimensionMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },
    #[error("decoder error for '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("encoder error for '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    ComputeBackend(#[from] BackendError),
}

/// Failures reported by a [`crate::backend::ComputeBackend`].
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("{stage} dispatched over an empty {width}x{height} grid")]
    EmptyDispatch {
        stage: Stage,
        width: usize,
        height: usize,
    },
    #[error("{stage} worker panicked: {message}")]
    WorkerPanicked { stage: Stage, message: String },
    #[error("{stage} returned without running its job")]
    NotExecuted { stage: Stage },
}
