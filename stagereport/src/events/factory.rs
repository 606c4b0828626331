//! Builds the configured sink.

use std::sync::Arc;
use tracing::info;

use super::{JsonLinesProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, QueuedProgressSink};
use crate::config::{ReporterConfig, SinkKind};
use crate::errors::{ConfigError, StagereportError};

/// The sink a reporter should forward to, plus the queue behind it if any.
#[derive(Clone)]
pub struct ConfiguredSink {
    sink: Arc<dyn ProgressSink>,
    queue: Option<Arc<QueuedProgressSink>>,
}

impl std::fmt::Debug for ConfiguredSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredSink")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl ConfiguredSink {
    /// Builds and, when queued, starts the sink described by `config`.
    ///
    /// A queued sink spawns its worker, so this must run inside a tokio
    /// runtime whenever [`ReporterConfig::uses_queue`] is true.
    pub fn build(config: &ReporterConfig) -> Result<Self, StagereportError> {
        config.validate()?;

        if config.sink == SinkKind::Http {
            let queue = QueuedProgressSink::new(http_transport(config)?);
            queue.start();
            info!(endpoint = ?config.endpoint, "Queued HTTP sink started");
            return Ok(Self::queued(queue));
        }

        let direct = direct_sink(config)?;
        if !config.queued {
            return Ok(Self {
                sink: direct,
                queue: None,
            });
        }

        let queue = QueuedProgressSink::forwarding(direct);
        queue.start();
        info!(sink = ?config.sink, "Queued sink started");
        Ok(Self::queued(queue))
    }

    fn queued(queue: Arc<QueuedProgressSink>) -> Self {
        Self {
            sink: queue.clone(),
            queue: Some(queue),
        }
    }

    /// Returns the sink to hand to a reporter.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn ProgressSink> {
        Arc::clone(&self.sink)
    }

    /// Returns the queue, when the sink is queued.
    #[must_use]
    pub fn queue(&self) -> Option<&Arc<QueuedProgressSink>> {
        self.queue.as_ref()
    }

    /// Drains the queue, if any. Direct sinks have nothing to flush.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.queue {
            queue.shutdown().await;
            info!(metrics = %queue.metrics().to_dict(), "Sink queue closed");
        }
    }
}

fn direct_sink(config: &ReporterConfig) -> Result<Arc<dyn ProgressSink>, StagereportError> {
    let sink: Arc<dyn ProgressSink> = match config.sink {
        SinkKind::None => Arc::new(NoOpProgressSink),
        SinkKind::Log => Arc::new(LoggingProgressSink::info()),
        SinkKind::Json => match &config.json_path {
            Some(path) => Arc::new(JsonLinesProgressSink::append_to(path)?),
            None => Arc::new(JsonLinesProgressSink::stdout()),
        },
        SinkKind::Http => {
            return Err(ConfigError::invalid("sink", "http sink is always queued").into())
        }
    };
    Ok(sink)
}

#[cfg(feature = "http")]
fn http_transport(config: &ReporterConfig) -> Result<Arc<dyn super::SinkTransport>, StagereportError> {
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or_else(|| ConfigError::invalid("endpoint", "required when sink is http"))?;
    Ok(Arc::new(super::HttpTransport::new(endpoint, config.http_timeout()?)?))
}

#[cfg(not(feature = "http"))]
fn http_transport(_config: &ReporterConfig) -> Result<Arc<dyn super::SinkTransport>, StagereportError> {
    Err(ConfigError::invalid("sink", "built without the http feature").into())
}
