//! # Stagereport
//!
//! Stage-progress reporting for long-running jobs.
//!
//! A job declares its ordered stages once, then reports which stage it is in
//! and, optionally, how far along that stage is. The reporter validates every
//! event against the job's stage set and its prior events, and forwards the
//! accepted ones to a pluggable sink.
//!
//! - **Stage registry**: one immutable, ordered stage set per job
//! - **Validating reporter**: stages only move forward, fractions only grow
//! - **Sinks**: tracing, JSON lines, in-memory, or an ordered async queue
//! - **Observer snapshots**: per-stage status for progress displays
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use stagereport::prelude::*;
//!
//! let reporter = ProgressReporter::shared(Arc::new(NoOpProgressSink));
//! let job = reporter.job("job-1");
//!
//! job.register_stages(["Stage One", "Stage Two"])?;
//! job.enter_stage("Stage One")?;
//! for i in 0..=10 {
//!     job.report_fraction("Stage One", i, 10)?;
//! }
//! job.enter_stage("Stage Two")?;
//!
//! assert!(job.report_fraction("Stage One", 10, 10).is_err());
//! # Ok::<(), ProgressError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod progress;
pub mod simulation;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ReporterConfig, SimulationConfig, SinkKind, StagePlan};
    pub use crate::core::{Fraction, JobId, ProgressEvent, ProgressUpdate, SinkMessage, StageStatus};
    pub use crate::errors::{ProgressError, SinkError, StagereportError};
    pub use crate::events::{
        CollectingProgressSink, ConfiguredSink, LoggingProgressSink, NoOpProgressSink,
        ProgressSink, QueuedProgressSink,
    };
    pub use crate::progress::{JobHandle, JobSnapshot, ProgressReporter, StageSnapshot};
    pub use crate::stages::{StageRegistry, StageSet};
    pub use crate::utils::{generate_job_id, iso_timestamp};
}
