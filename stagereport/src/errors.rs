//! Error types for stage-progress reporting.
//!
//! Validation failures are local programming errors in the calling job and
//! are surfaced synchronously. Sink failures are kept separate: they never
//! fail a `report` call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stagereport operations.
#[derive(Debug, Error)]
pub enum StagereportError {
    /// A registration or progress event was rejected.
    #[error("{0}")]
    Progress(#[from] ProgressError),

    /// A sink failed to accept or deliver a message.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The tracing subscriber could not be installed.
    #[error("{0}")]
    Tracing(#[from] TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a stage list was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationProblem {
    /// No stage names were supplied.
    Empty,
    /// A stage name was empty or whitespace.
    BlankName,
    /// The same stage name appears twice.
    DuplicateName,
    /// The job already has a stage set.
    AlreadyRegistered,
}

impl std::fmt::Display for RegistrationProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "stage list is empty"),
            Self::BlankName => write!(f, "stage name is blank"),
            Self::DuplicateName => write!(f, "duplicate stage name"),
            Self::AlreadyRegistered => write!(f, "stages already registered"),
        }
    }
}

/// Validation failures of the reporting protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    /// The stage list was empty, had duplicates, or was registered twice.
    #[error("Invalid stage registration for job '{job_id}': {problem}{}", fmt_detail(.detail))]
    InvalidRegistration {
        /// The job identity.
        job_id: String,
        /// What was wrong.
        problem: RegistrationProblem,
        /// The offending stage name, when there is one.
        detail: Option<String>,
    },

    /// The stage name is not part of the job's stage set.
    #[error("Unknown stage '{stage}' for job '{job_id}'")]
    UnknownStage {
        /// The job identity.
        job_id: String,
        /// The stage name that was reported.
        stage: String,
    },

    /// The stage comes before the job's current stage.
    #[error("Stage regression for job '{job_id}': '{stage}' (ordinal {ordinal}) is before current stage ordinal {current_ordinal}")]
    StageRegression {
        /// The job identity.
        job_id: String,
        /// The stage name that was reported.
        stage: String,
        /// Ordinal of the reported stage.
        ordinal: usize,
        /// Ordinal of the job's current stage.
        current_ordinal: usize,
    },

    /// The numerator/denominator pair is incomplete or out of range.
    #[error("Malformed fraction for stage '{stage}': numerator={}, denominator={}", fmt_opt(.numerator), fmt_opt(.denominator))]
    MalformedFraction {
        /// The job identity.
        job_id: String,
        /// The stage name that was reported.
        stage: String,
        /// The reported numerator.
        numerator: Option<i64>,
        /// The reported denominator.
        denominator: Option<i64>,
    },

    /// The fraction is lower than the last one recorded for the stage.
    #[error("Fraction regression for stage '{stage}': {numerator}/{denominator} is below last recorded {last_numerator}/{last_denominator}")]
    FractionRegression {
        /// The job identity.
        job_id: String,
        /// The stage name that was reported.
        stage: String,
        /// The reported numerator.
        numerator: i64,
        /// The reported denominator.
        denominator: i64,
        /// The last recorded numerator.
        last_numerator: i64,
        /// The last recorded denominator.
        last_denominator: i64,
    },
}

fn fmt_opt(value: &Option<i64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(" ('{d}')"))
        .unwrap_or_default()
}

impl ProgressError {
    /// Stable error code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => "PROGRESS-001-REGISTRATION",
            Self::UnknownStage { .. } => "PROGRESS-002-UNKNOWN-STAGE",
            Self::StageRegression { .. } => "PROGRESS-003-STAGE-REGRESSION",
            Self::MalformedFraction { .. } => "PROGRESS-004-MALFORMED-FRACTION",
            Self::FractionRegression { .. } => "PROGRESS-005-FRACTION-REGRESSION",
        }
    }

    /// The failure kind name, as exposed to bindings.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => "InvalidRegistration",
            Self::UnknownStage { .. } => "UnknownStage",
            Self::StageRegression { .. } => "StageRegression",
            Self::MalformedFraction { .. } => "MalformedFraction",
            Self::FractionRegression { .. } => "FractionRegression",
        }
    }

    /// Returns the job identity the error refers to.
    #[must_use]
    pub fn job_id(&self) -> &str {
        match self {
            Self::InvalidRegistration { job_id, .. }
            | Self::UnknownStage { job_id, .. }
            | Self::StageRegression { job_id, .. }
            | Self::MalformedFraction { job_id, .. }
            | Self::FractionRegression { job_id, .. } => job_id,
        }
    }

    /// Returns a hint for fixing the calling job.
    #[must_use]
    pub fn fix_hint(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => {
                "Register a non-empty list of distinct stage names exactly once per job."
            }
            Self::UnknownStage { .. } => {
                "Report only stages that were passed to register_stages. Check for typos."
            }
            Self::StageRegression { .. } => {
                "Stages are entered in registration order; an earlier stage cannot be re-entered."
            }
            Self::MalformedFraction { .. } => {
                "Pass both total and current, with 0 <= current <= total and total > 0."
            }
            Self::FractionRegression { .. } => {
                "Progress within a stage must not decrease."
            }
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("job_id".to_string(), serde_json::json!(self.job_id()));

        match self {
            Self::InvalidRegistration { problem, detail, .. } => {
                map.insert("problem".to_string(), serde_json::json!(problem));
                if let Some(detail) = detail {
                    map.insert("detail".to_string(), serde_json::json!(detail));
                }
            }
            Self::UnknownStage { stage, .. } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
            }
            Self::StageRegression {
                stage,
                ordinal,
                current_ordinal,
                ..
            } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("ordinal".to_string(), serde_json::json!(ordinal));
                map.insert(
                    "current_ordinal".to_string(),
                    serde_json::json!(current_ordinal),
                );
            }
            Self::MalformedFraction {
                stage,
                numerator,
                denominator,
                ..
            } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("numerator".to_string(), serde_json::json!(numerator));
                map.insert("denominator".to_string(), serde_json::json!(denominator));
            }
            Self::FractionRegression {
                stage,
                numerator,
                denominator,
                last_numerator,
                last_denominator,
                ..
            } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("numerator".to_string(), serde_json::json!(numerator));
                map.insert("denominator".to_string(), serde_json::json!(denominator));
                map.insert(
                    "last_numerator".to_string(),
                    serde_json::json!(last_numerator),
                );
                map.insert(
                    "last_denominator".to_string(),
                    serde_json::json!(last_denominator),
                );
            }
        }

        map.insert("fix_hint".to_string(), serde_json::json!(self.fix_hint()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised by sinks and transports.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink no longer accepts messages.
    #[error("Sink closed")]
    Closed,

    /// Writing the message failed.
    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The message could not be encoded.
    #[error("Sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport rejected or failed to deliver the message.
    #[error("Sink transport error: {0}")]
    Transport(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or unknown.
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid {
        /// The field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// The level directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("Tracing already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}
