//! Asynchronous delivery transports used behind the queued sink.

use async_trait::async_trait;
use std::sync::Arc;

use super::sink::{dispatch, ProgressSink};
use crate::core::SinkMessage;
use crate::errors::SinkError;

/// Delivers sink messages to an external system.
#[async_trait]
pub trait SinkTransport: Send + Sync {
    /// Delivers one message. Called in enqueue order, one at a time.
    async fn deliver(&self, message: SinkMessage) -> Result<(), SinkError>;
}

/// Adapts a synchronous [`ProgressSink`] into a transport.
#[derive(Clone)]
pub struct ForwardingTransport {
    sink: Arc<dyn ProgressSink>,
}

impl ForwardingTransport {
    /// Wraps a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }
}

impl std::fmt::Debug for ForwardingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl SinkTransport for ForwardingTransport {
    async fn deliver(&self, message: SinkMessage) -> Result<(), SinkError> {
        dispatch(self.sink.as_ref(), &message)
    }
}

/// Pushes each message as a JSON body to an HTTP endpoint.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Creates a transport posting to `endpoint` with the given request timeout.
    pub fn new(endpoint: &str, timeout: std::time::Duration) -> Result<Self, SinkError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| SinkError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl SinkTransport for HttpTransport {
    async fn deliver(&self, message: SinkMessage) -> Result<(), SinkError> {
        self.client
            .post(self.endpoint.clone())
            .json(&message)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(())
    }
}
