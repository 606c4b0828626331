//! Tracing subscriber setup and span attributes for progress reporting.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to binaries and bindings via [`init_tracing`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::core::ProgressUpdate;
use crate::errors::TracingError;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. `level` accepts any
/// `EnvFilter` directive, e.g. `"info"` or `"stagereport=debug,warn"`.
///
/// # Errors
///
/// Returns [`TracingError`] if the directive is invalid or a subscriber is
/// already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let subscriber = Registry::default().with(env_filter);

    match format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true);
            tracing::subscriber::set_global_default(subscriber.with(layer))?;
        }
        LogFormat::Pretty => {
            let layer = fmt::layer().pretty().with_target(true).with_level(true);
            tracing::subscriber::set_global_default(subscriber.with(layer))?;
        }
    }

    Ok(())
}

/// Span attributes for one progress event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSpanAttributes {
    /// Job identity.
    pub job_id: String,
    /// Stage name.
    pub stage: Option<String>,
    /// 0-based stage position.
    pub stage_ordinal: Option<usize>,
    /// Number of registered stages.
    pub stage_count: Option<usize>,
    /// Fraction as `n/d`.
    pub fraction: Option<String>,
    /// Outcome such as `accepted` or a rejection kind.
    pub outcome: Option<String>,
}

impl ProgressSpanAttributes {
    /// Creates attributes for a job.
    #[must_use]
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    /// Creates attributes describing an accepted update.
    #[must_use]
    pub fn from_update(update: &ProgressUpdate) -> Self {
        Self {
            job_id: update.job_id.to_string(),
            stage: Some(update.stage.clone()),
            stage_ordinal: Some(update.stage_ordinal),
            stage_count: Some(update.stage_count),
            fraction: update.fraction().map(|f| f.to_string()),
            outcome: Some("accepted".to_string()),
        }
    }

    /// Sets the stage name.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("job.id".to_string(), self.job_id.clone());

        if let Some(ref v) = self.stage {
            attrs.insert("stage.name".to_string(), v.clone());
        }
        if let Some(v) = self.stage_ordinal {
            attrs.insert("stage.ordinal".to_string(), v.to_string());
        }
        if let Some(v) = self.stage_count {
            attrs.insert("stage.count".to_string(), v.to_string());
        }
        if let Some(ref v) = self.fraction {
            attrs.insert("progress.fraction".to_string(), v.clone());
        }
        if let Some(ref v) = self.outcome {
            attrs.insert("progress.outcome".to_string(), v.clone());
        }

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fraction, JobId};

    #[test]
    fn test_attributes_from_update() {
        let update = ProgressUpdate::new(JobId::new("job-1"), "Stage Two", 1, 3, Fraction::new(3, 10));
        let otel = ProgressSpanAttributes::from_update(&update).to_otel_attributes();

        assert_eq!(otel.get("job.id"), Some(&"job-1".to_string()));
        assert_eq!(otel.get("stage.name"), Some(&"Stage Two".to_string()));
        assert_eq!(otel.get("stage.ordinal"), Some(&"1".to_string()));
        assert_eq!(otel.get("stage.count"), Some(&"3".to_string()));
        assert_eq!(otel.get("progress.fraction"), Some(&"3/10".to_string()));
        assert_eq!(otel.get("progress.outcome"), Some(&"accepted".to_string()));
    }

    #[test]
    fn test_marker_has_no_fraction_attribute() {
        let update = ProgressUpdate::new(JobId::new("job-1"), "Stage Three", 2, 3, None);
        let otel = ProgressSpanAttributes::from_update(&update).to_otel_attributes();
        assert!(!otel.contains_key("progress.fraction"));
    }

    #[test]
    fn test_rejection_outcome() {
        let otel = ProgressSpanAttributes::new("job-1")
            .with_stage("Stage One")
            .with_outcome("StageRegression")
            .to_otel_attributes();
        assert_eq!(otel.get("progress.outcome"), Some(&"StageRegression".to_string()));
        assert!(!otel.contains_key("stage.ordinal"));
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = init_tracing("stagereport=loud", LogFormat::Pretty).unwrap_err();
        assert!(matches!(err, TracingError::InvalidFilter(_)));
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("report");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(timer.name(), "report");
        assert!(timer.finish() >= 5.0);
    }
}
