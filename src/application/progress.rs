//! Throttled progress reporting for long-running steps.
//!
//! A `ProgressMonitor` is an ordinary value owned by the section restore it
//! reports on. There is no process-wide start time; a `WorkflowRun` keeps
//! its own clock.

use log::info;
use std::time::{Duration, Instant};

/// Logs status lines for one operation, at most once per `update_every`.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    operation: String,
    started: Instant,
    last_update: Option<Instant>,
    update_every: Duration,
}

impl ProgressMonitor {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_interval(operation, Duration::from_secs(5))
    }

    pub fn with_interval(operation: impl Into<String>, update_every: Duration) -> Self {
        Self {
            operation: operation.into(),
            started: Instant::now(),
            last_update: None,
            update_every,
        }
    }

    /// Logs `status` unless the previous line was logged too recently.
    /// Returns whether a line was emitted.
    pub fn update(&mut self, status: &str) -> bool {
        let now = Instant::now();
        let due = self
            .last_update
            .map_or(true, |last| now.duration_since(last) >= self.update_every);
        if due {
            info!(
                "[{}] {} (elapsed: {}s)",
                self.operation,
                status,
                self.elapsed().as_secs()
            );
            self.last_update = Some(now);
        }
        due
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}
