//! Worker pools that run blocking send tasks

use ras_endpoint_types::{EndpointConfig, EndpointError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::{Builder, Handle};
use tracing::debug;

/// A unit of blocking work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Container-owned pool that executes blocking tasks.
///
/// Submission is fire-and-forget. A pool that cannot take the task hands it
/// back in `Err`; the caller decides what to do with it.
pub trait WorkerPool: Send + Sync {
    fn submit(&self, task: Task) -> Result<(), Task>;
}

/// Runs tasks on the blocking thread pool of a tokio runtime
pub struct TokioWorkerPool {
    handle: Handle,
    shut_down: AtomicBool,
}

impl TokioWorkerPool {
    /// Use the blocking pool of the runtime behind `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self, EndpointError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| EndpointError::InvalidConfig(format!("no tokio runtime available: {}", e)))
    }

    /// A runtime builder whose blocking pool is sized from `config`
    pub fn runtime_builder(config: &EndpointConfig) -> Builder {
        let mut builder = Builder::new_multi_thread();
        builder
            .enable_all()
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name("ras-endpoint-worker");
        builder
    }

    /// Refuse further tasks. Tasks already submitted still run.
    pub fn shutdown(&self) {
        debug!("Worker pool shutting down");
        self.shut_down.store(true, Ordering::Release);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl WorkerPool for TokioWorkerPool {
    fn submit(&self, task: Task) -> Result<(), Task> {
        if self.is_shut_down() {
            return Err(task);
        }
        self.handle.spawn_blocking(task);
        Ok(())
    }
}
