//! Progress events and the messages forwarded to sinks.

use serde::{Deserialize, Serialize};

use super::{Fraction, JobId};

/// A progress event as issued by a job.
///
/// Either both `numerator` and `denominator` are present (fractional
/// progress) or both are absent (a "stage entered" marker). The pair is not
/// validated here; the reporter does that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The stage name.
    pub stage: String,
    /// Units of work done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<i64>,
    /// Total units of work in the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<i64>,
}

impl ProgressEvent {
    /// Creates a bare "stage entered" marker.
    #[must_use]
    pub fn entered(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            numerator: None,
            denominator: None,
        }
    }

    /// Creates a fractional progress event.
    #[must_use]
    pub fn fraction(stage: impl Into<String>, numerator: i64, denominator: i64) -> Self {
        Self {
            stage: stage.into(),
            numerator: Some(numerator),
            denominator: Some(denominator),
        }
    }
}

/// A validated progress event, as delivered to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The job identity.
    pub job_id: JobId,
    /// The stage name.
    pub stage: String,
    /// 0-based position of the stage in the registered set.
    pub stage_ordinal: usize,
    /// Number of registered stages.
    pub stage_count: usize,
    /// Units of work done, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<i64>,
    /// Total units of work, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<i64>,
    /// When the event was accepted (ISO 8601).
    pub timestamp: String,
}

impl ProgressUpdate {
    /// Builds an update from an accepted event.
    #[must_use]
    pub fn new(
        job_id: JobId,
        stage: impl Into<String>,
        stage_ordinal: usize,
        stage_count: usize,
        fraction: Option<Fraction>,
    ) -> Self {
        Self {
            job_id,
            stage: stage.into(),
            stage_ordinal,
            stage_count,
            numerator: fraction.map(|f| f.numerator()),
            denominator: fraction.map(|f| f.denominator()),
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the fraction carried by the update, if any.
    #[must_use]
    pub fn fraction(&self) -> Option<Fraction> {
        match (self.numerator, self.denominator) {
            (Some(n), Some(d)) => Fraction::new(n, d),
            _ => None,
        }
    }
}

/// A message delivered through a sink transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkMessage {
    /// A job registered its ordered stage list.
    StageSetRegistered {
        /// The job identity.
        job_id: JobId,
        /// Stage names in ordinal order.
        stages: Vec<String>,
        /// When the registration was accepted (ISO 8601).
        timestamp: String,
    },
    /// A validated progress event.
    Progress(ProgressUpdate),
}

impl SinkMessage {
    /// Creates a registration message stamped now.
    #[must_use]
    pub fn stage_set_registered(job_id: JobId, stages: Vec<String>) -> Self {
        Self::StageSetRegistered {
            job_id,
            stages,
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the job this message belongs to.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        match self {
            Self::StageSetRegistered { job_id, .. } => job_id,
            Self::Progress(update) => &update.job_id,
        }
    }

    /// Returns the message type tag.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::StageSetRegistered { .. } => "stage_set_registered",
            Self::Progress(_) => "progress",
        }
    }
}
