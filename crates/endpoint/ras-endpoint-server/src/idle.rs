//! Idle-timeout bookkeeping for a connection

use ras_endpoint_types::EndpointConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Tracks the last activity on a connection.
///
/// `restart` is lock-free and may be called from any thread, any number of
/// times. Activity never moves backwards: concurrent restarts keep the latest
/// timestamp.
#[derive(Debug)]
pub struct IdleTimer {
    origin: Instant,
    /// Milliseconds since `origin` of the last activity
    last_activity_ms: AtomicU64,
    restarts: AtomicU64,
    timeout: Option<Duration>,
}

impl IdleTimer {
    /// `None` disables expiry
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            origin: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(config.effective_idle_timeout())
    }

    /// Record activity now
    pub fn restart(&self) {
        let now_ms = self.origin.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(now_ms, Ordering::AcqRel);
        let restarts = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Idle timer restarted ({} restarts)", restarts);
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Acquire));
        self.origin.elapsed().saturating_sub(last)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_expired(&self) -> bool {
        self.timeout.is_some_and(|timeout| self.idle_for() >= timeout)
    }

    /// Number of restarts so far
    pub fn restart_count(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Resolve once the connection has been idle for the full timeout.
    ///
    /// Never resolves when expiry is disabled.
    pub async fn expired(&self) {
        let Some(timeout) = self.timeout else {
            return std::future::pending().await;
        };

        loop {
            let idle = self.idle_for();
            if idle >= timeout {
                return;
            }
            tokio::time::sleep(timeout - idle).await;
        }
    }
}
