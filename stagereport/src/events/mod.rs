//! Sinks for validated progress.
//!
//! The reporter forwards every accepted registration and progress event to
//! a [`ProgressSink`]. Concrete sinks bind that boundary to a transport: a
//! tracing log line, a JSON-lines stream, an in-memory collector, or an
//! ordered background queue in front of an async [`SinkTransport`].

mod factory;
mod json_lines;
mod queue;
mod sink;
mod transport;

pub use factory::ConfiguredSink;
pub use json_lines::JsonLinesProgressSink;
pub use queue::{QueueMetrics, QueuedProgressSink};
pub use sink::{
    dispatch, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink,
};
#[cfg(test)]
pub use sink::MockProgressSink;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{ForwardingTransport, SinkTransport};
