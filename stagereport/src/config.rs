//! Configuration for reporters and the bundled simulation.
//!
//! Everything is plain `serde` data with defaults, so a JSON file only needs
//! to name the fields it changes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::observability::LogFormat;

/// Which sink receives validated progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Discard everything.
    None,
    /// Emit a tracing event per message.
    #[default]
    Log,
    /// Write one JSON object per line.
    Json,
    /// POST each message to an HTTP endpoint. Always queued.
    Http,
}

/// Reporter and sink configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// The sink kind.
    #[serde(default)]
    pub sink: SinkKind,
    /// Whether to put the sink behind the ordered background queue.
    #[serde(default)]
    pub queued: bool,
    /// File the JSON sink appends to. Stdout when unset.
    #[serde(default)]
    pub json_path: Option<String>,
    /// Endpoint for the HTTP sink.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: f64,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_http_timeout() -> f64 {
    10.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            queued: false,
            json_path: None,
            endpoint: None,
            http_timeout_seconds: default_http_timeout(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl ReporterConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sink kind.
    #[must_use]
    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Routes the sink through the ordered queue.
    #[must_use]
    pub fn with_queued(mut self, queued: bool) -> Self {
        self.queued = queued;
        self
    }

    /// Sets the JSON output file.
    #[must_use]
    pub fn with_json_path(mut self, path: impl Into<String>) -> Self {
        self.json_path = Some(path.into());
        self
    }

    /// Sets the HTTP endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the log level directive.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Gets the HTTP timeout as Duration.
    pub fn http_timeout(&self) -> Result<Duration, ConfigError> {
        if self.http_timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "http_timeout_seconds",
                "must be a positive number",
            ));
        }
        Duration::try_from_secs_f64(self.http_timeout_seconds).map_err(|e| {
            ConfigError::invalid("http_timeout_seconds", e.to_string())
        })
    }

    /// Returns true if messages go through the background queue.
    #[must_use]
    pub fn uses_queue(&self) -> bool {
        self.queued || self.sink == SinkKind::Http
    }

    /// Checks values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::invalid("log_level", "must not be empty"));
        }
        if self.sink == SinkKind::Http {
            if self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "endpoint",
                    "required when sink is http",
                ));
            }
            self.http_timeout()?;
        }
        Ok(())
    }
}

/// One stage of a simulated job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    /// The stage name.
    pub name: String,
    /// Steps to report, from `0/total` to `total/total`. Bare marker only
    /// when unset.
    #[serde(default)]
    pub total: Option<u64>,
    /// Pause between steps in milliseconds.
    #[serde(default)]
    pub step_delay_ms: u64,
}

impl StagePlan {
    /// A stage with a known number of steps.
    #[must_use]
    pub fn counted(name: impl Into<String>, total: u64) -> Self {
        Self {
            name: name.into(),
            total: Some(total),
            step_delay_ms: 0,
        }
    }

    /// A stage reported with a bare marker.
    #[must_use]
    pub fn unmeasured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: None,
            step_delay_ms: 0,
        }
    }

    /// Sets the pause between steps.
    #[must_use]
    pub fn with_step_delay_ms(mut self, delay_ms: u64) -> Self {
        self.step_delay_ms = delay_ms;
        self
    }

    /// Gets the pause as Duration.
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Number of progress events this stage produces.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        // entry marker plus 0..=total
        1 + self.total.map_or(0, |t| t + 1)
    }
}

/// A simulated job: the stages to register and how to walk them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Display name used in logs.
    #[serde(default = "default_job_name")]
    pub job_name: String,
    /// Job id. Generated when unset.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Stages in order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StagePlan>,
    /// Reporter settings.
    #[serde(default)]
    pub reporter: ReporterConfig,
}

fn default_job_name() -> String {
    "demo".to_string()
}

fn default_stages() -> Vec<StagePlan> {
    vec![
        StagePlan::counted("Stage One", 100),
        StagePlan::counted("Stage Two", 10),
        StagePlan::unmeasured("Stage Three"),
    ]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            job_id: None,
            stages: default_stages(),
            reporter: ReporterConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Creates the default three-stage simulation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Sets the job id.
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Replaces the stage plan.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StagePlan>) -> Self {
        self.stages = stages;
        self
    }

    /// Uses the same pause for every stage.
    #[must_use]
    pub fn with_step_delay_ms(mut self, delay_ms: u64) -> Self {
        for stage in &mut self.stages {
            stage.step_delay_ms = delay_ms;
        }
        self
    }

    /// Sets the reporter settings.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ReporterConfig) -> Self {
        self.reporter = reporter;
        self
    }

    /// Stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    /// Number of progress events a full run produces.
    #[must_use]
    pub fn expected_events(&self) -> u64 {
        self.stages.iter().map(StagePlan::event_count).sum()
    }

    /// Checks values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::invalid("stages", "at least one stage is required"));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(ConfigError::invalid("stages.name", "must not be blank"));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(ConfigError::invalid(
                    "stages.name",
                    format!("duplicate stage '{}'", stage.name),
                ));
            }
            match stage.total {
                Some(0) => {
                    return Err(ConfigError::invalid(
                        "stages.total",
                        format!("stage '{}' needs a positive total", stage.name),
                    ))
                }
                Some(t) if i64::try_from(t).is_err() => {
                    return Err(ConfigError::invalid(
                        "stages.total",
                        format!("stage '{}' total is too large", stage.name),
                    ))
                }
                _ => {}
            }
        }

        self.reporter.validate()
    }
}
