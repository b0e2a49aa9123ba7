// src/session.rs

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Execution context for one run: owns the worker pool that column maps run on.
///
/// Acquired at the start of a run and released when dropped, on success or error.
pub struct Session {
    app_name: String,
    pool: ThreadPool,
    started: Instant,
}

impl Session {
    /// `threads == 0` lets rayon pick one worker per CPU.
    pub fn start(app_name: &str, threads: usize) -> Result<Self> {
        let prefix = app_name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::Session(e.to_string()))?;
        info!(app = %app_name, threads = pool.current_num_threads(), "session started");
        Ok(Self {
            app_name: app_name.to_string(),
            pool,
            started: Instant::now(),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Run `op` with this session's pool as the rayon context.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!(app = %self.app_name, elapsed = ?self.started.elapsed(), "session stopped");
    }
}
