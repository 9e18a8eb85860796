//! Execution of data-parallel grid stages.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::BackendError;
use crate::report::Stage;

/// Runs one stage job to completion over an output grid.
///
/// `dispatch` only returns once every output pixel of the job is written, which
/// is the barrier between consecutive stages.
pub trait ComputeBackend {
    fn name(&self) -> String;

    fn threads(&self) -> usize;

    fn dispatch(
        &self,
        stage: Stage,
        dims: (usize, usize),
        job: &mut (dyn FnMut() + Send),
    ) -> Result<Duration, BackendError>;
}

/// CPU backend: stage jobs run on a dedicated rayon pool, so ndarray's
/// `par_for_each` inside a job fans out over that pool's workers.
pub struct RayonBackend {
    pool: ThreadPool,
}

impl RayonBackend {
    /// `threads == 0` uses rayon's default (one worker per logical core).
    pub fn new(threads: usize) -> Result<Self, BackendError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("zncc-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl ComputeBackend for RayonBackend {
    fn name(&self) -> String {
        format!("rayon ({} threads)", self.pool.current_num_threads())
    }

    fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn dispatch(
        &self,
        stage: Stage,
        dims: (usize, usize),
        job: &mut (dyn FnMut() + Send),
    ) -> Result<Duration, BackendError> {
        let (width, height) = dims;
        if width == 0 || height == 0 {
            return Err(BackendError::EmptyDispatch {
                stage,
                width,
                height,
            });
        }
        let start = Instant::now();
        self.pool
            .install(|| panic::catch_unwind(AssertUnwindSafe(|| job())))
            .map_err(|payload| BackendError::WorkerPanicked {
                stage,
                message: panic_message(payload),
            })?;
        Ok(start.elapsed())
    }
}
