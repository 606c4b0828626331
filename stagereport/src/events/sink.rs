//! Progress sink trait and implementations.

use tracing::{debug, info, Level};

use crate::core::{JobId, ProgressUpdate, SinkMessage};
use crate::errors::SinkError;

/// Trait for sinks that receive validated progress.
///
/// The reporter calls a sink while holding the job's lock, so calls for one
/// job arrive in the order `report` was called. Implementations should not
/// block for long; see [`QueuedProgressSink`](super::QueuedProgressSink) for
/// handing delivery to a background task.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Called once when a job registers its ordered stage list.
    fn on_stage_set_registered(&self, job_id: &JobId, stages: &[String]) -> Result<(), SinkError>;

    /// Called for every accepted progress event.
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), SinkError>;
}

/// Dispatches a message to the matching sink callback.
pub fn dispatch(sink: &dyn ProgressSink, message: &SinkMessage) -> Result<(), SinkError> {
    match message {
        SinkMessage::StageSetRegistered { job_id, stages, .. } => {
            sink.on_stage_set_registered(job_id, stages)
        }
        SinkMessage::Progress(update) => sink.on_progress(update),
    }
}

/// A no-op sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn on_stage_set_registered(&self, _job_id: &JobId, _stages: &[String]) -> Result<(), SinkError> {
        Ok(())
    }

    fn on_progress(&self, _update: &ProgressUpdate) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that logs events using the tracing framework.
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

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_progress(&self, update: &ProgressUpdate) {
        let progress = update
            .fraction()
            .map_or_else(|| "entered".to_string(), |f| f.to_string());

        if self.level == Level::DEBUG {
            debug!(
                job_id = %update.job_id,
                stage = %update.stage,
                stage_ordinal = update.stage_ordinal,
                stage_count = update.stage_count,
                progress = %progress,
                "Progress"
            );
        } else {
            info!(
                job_id = %update.job_id,
                stage = %update.stage,
                stage_ordinal = update.stage_ordinal,
                stage_count = update.stage_count,
                progress = %progress,
                "Progress"
            );
        }
    }
}

impl ProgressSink for LoggingProgressSink {
    fn on_stage_set_registered(&self, job_id: &JobId, stages: &[String]) -> Result<(), SinkError> {
        if self.level == Level::DEBUG {
            debug!(job_id = %job_id, stages = ?stages, "Stage set registered");
        } else {
            info!(job_id = %job_id, stages = ?stages, "Stage set registered");
        }
        Ok(())
    }

    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), SinkError> {
        self.log_progress(update);
        Ok(())
    }
}

/// A collecting sink for tests and in-process observers.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    messages: parking_lot::RwLock<Vec<SinkMessage>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected messages.
    #[must_use]
    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages.read().clone()
    }

    /// Returns the collected progress updates, in arrival order.
    #[must_use]
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.messages
            .read()
            .iter()
            .filter_map(|m| match m {
                SinkMessage::Progress(update) => Some(update.clone()),
                SinkMessage::StageSetRegistered { .. } => None,
            })
            .collect()
    }

    /// Returns the progress updates of one job.
    #[must_use]
    pub fn updates_for(&self, job_id: &JobId) -> Vec<ProgressUpdate> {
        self.updates()
            .into_iter()
            .filter(|u| &u.job_id == job_id)
            .collect()
    }

    /// Returns the registered stage lists, in arrival order.
    #[must_use]
    pub fn registrations(&self) -> Vec<(JobId, Vec<String>)> {
        self.messages
            .read()
            .iter()
            .filter_map(|m| match m {
                SinkMessage::StageSetRegistered { job_id, stages, .. } => {
                    Some((job_id.clone(), stages.clone()))
                }
                SinkMessage::Progress(_) => None,
            })
            .collect()
    }

    /// Returns the number of collected messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Clears all collected messages.
    pub fn clear(&self) {
        self.messages.write().clear();
    }
}

impl ProgressSink for CollectingProgressSink {
    fn on_stage_set_registered(&self, job_id: &JobId, stages: &[String]) -> Result<(), SinkError> {
        self.messages
            .write()
            .push(SinkMessage::stage_set_registered(job_id.clone(), stages.to_vec()));
        Ok(())
    }

    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), SinkError> {
        self.messages.write().push(SinkMessage::Progress(update.clone()));
        Ok(())
    }
}
