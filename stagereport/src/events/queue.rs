//! Ordered asynchronous sink.
//!
//! Messages are enqueued without blocking the reporting job and delivered by
//! a single worker task in FIFO order, so per-job ordering at the transport
//! matches the order `report` was called. Nothing is dropped: the queue is
//! unbounded and delivery failures are counted and logged, not retried.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::transport::{ForwardingTransport, SinkTransport};
use super::ProgressSink;
use crate::core::{JobId, ProgressUpdate, SinkMessage};
use crate::errors::SinkError;

/// Counters for the queued sink.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    last_delivery: RwLock<Option<Instant>>,
}

impl QueueMetrics {
    fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        *self.last_delivery.write() = Some(Instant::now());
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of enqueued messages.
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Returns the number of delivered messages.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of messages the transport failed to deliver.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the number of messages not yet handed to the transport.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.enqueued()
            .saturating_sub(self.delivered() + self.failed())
    }

    /// Returns when the last successful delivery happened.
    #[must_use]
    pub fn last_delivery(&self) -> Option<Instant> {
        *self.last_delivery.read()
    }

    /// Converts metrics to a dictionary.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "enqueued": self.enqueued(),
            "delivered": self.delivered(),
            "failed": self.failed(),
            "pending": self.pending(),
        })
    }
}

/// A non-blocking sink that hands messages to a background worker.
pub struct QueuedProgressSink {
    transport: Arc<dyn SinkTransport>,
    tx: Mutex<Option<mpsc::UnboundedSender<SinkMessage>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<SinkMessage>>>,
    running: AtomicBool,
    metrics: Arc<QueueMetrics>,
    worker_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl QueuedProgressSink {
    /// Creates a queued sink in front of a transport.
    ///
    /// Messages enqueued before [`start`](Self::start) are held and
    /// delivered once the worker runs.
    #[must_use]
    pub fn new(transport: Arc<dyn SinkTransport>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            transport,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            running: AtomicBool::new(false),
            metrics: Arc::new(QueueMetrics::default()),
            worker_handle: Mutex::new(None),
        })
    }

    /// Creates a queued sink forwarding to a synchronous sink.
    #[must_use]
    pub fn forwarding(downstream: Arc<dyn ProgressSink>) -> Arc<Self> {
        Self::new(Arc::new(ForwardingTransport::new(downstream)))
    }

    /// Starts the background worker. Must be called inside a tokio runtime.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(mut receiver) = self.rx.lock().take() else {
            return;
        };

        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);

        let handle = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let event_type = message.event_type();
                let job_id = message.job_id().clone();
                match transport.deliver(message).await {
                    Ok(()) => metrics.record_delivery(),
                    Err(e) => {
                        metrics.record_failure();
                        warn!(
                            job_id = %job_id,
                            event_type,
                            error = %e,
                            "Sink delivery failed"
                        );
                    }
                }
            }
            debug!("Sink queue drained");
        });

        *self.worker_handle.lock() = Some(handle);
    }

    /// Closes the queue and waits until every enqueued message was handed
    /// to the transport.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().take());

        let handle = self.worker_handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sink worker ended abnormally");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns whether the worker is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Returns whether the queue still accepts messages.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    fn enqueue(&self, message: SinkMessage) -> Result<(), SinkError> {
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(SinkError::Closed)?;
        tx.send(message).map_err(|_| SinkError::Closed)?;
        self.metrics.record_enqueue();
        Ok(())
    }
}

impl std::fmt::Debug for QueuedProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedProgressSink")
            .field("running", &self.is_running())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl ProgressSink for QueuedProgressSink {
    fn on_stage_set_registered(&self, job_id: &JobId, stages: &[String]) -> Result<(), SinkError> {
        self.enqueue(SinkMessage::stage_set_registered(
            job_id.clone(),
            stages.to_vec(),
        ))
    }

    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), SinkError> {
        self.enqueue(SinkMessage::Progress(update.clone()))
    }
}
