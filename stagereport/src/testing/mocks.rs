//! Sinks with scripted behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{JobId, ProgressUpdate};
use crate::errors::SinkError;
use crate::events::ProgressSink;

/// A sink that rejects every message.
#[derive(Debug, Default)]
pub struct FailingProgressSink {
    attempts: AtomicUsize,
}

impl FailingProgressSink {
    /// Creates a new failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many messages were offered.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    fn fail(&self) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        Err(SinkError::Transport(format!(
            "simulated sink failure (attempt {attempt})"
        )))
    }
}

impl ProgressSink for FailingProgressSink {
    fn on_stage_set_registered(&self, _job_id: &JobId, _stages: &[String]) -> Result<(), SinkError> {
        self.fail()
    }

    fn on_progress(&self, _update: &ProgressUpdate) -> Result<(), SinkError> {
        self.fail()
    }
}
