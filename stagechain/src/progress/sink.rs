//! Progress sink trait and implementations.

use parking_lot::Mutex;
use tracing::{debug, info, Level};

/// Receives cumulative progress updates.
///
/// Sinks should never fail; errors are logged and suppressed.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Receives a cumulative percent complete for the run.
    fn send_update(&self, stage: &str, percent: f64);
}

/// A sink that discards all updates.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn send_update(&self, _stage: &str, _percent: f64) {}
}

/// A sink that logs updates using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ProgressSink for LoggingProgressSink {
    fn send_update(&self, stage: &str, percent: f64) {
        if self.level == Level::DEBUG {
            debug!(stage = %stage, percent, "Progress {:.1}%", percent);
        } else {
            info!(stage = %stage, percent, "Progress {:.1}%", percent);
        }
    }
}

/// A sink that keeps every update, for tests and callers that poll.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    updates: Mutex<Vec<(String, f64)>>,
}

impl CollectingProgressSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all updates received so far.
    #[must_use]
    pub fn updates(&self) -> Vec<(String, f64)> {
        self.updates.lock().clone()
    }

    /// Returns the most recent percent, if any.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.updates.lock().last().map(|(_, p)| *p)
    }

    /// Clears collected updates.
    pub fn clear(&self) {
        self.updates.lock().clear();
    }
}

impl ProgressSink for CollectingProgressSink {
    fn send_update(&self, stage: &str, percent: f64) {
        self.updates.lock().push((stage.to_string(), percent));
    }
}
