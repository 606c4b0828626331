//! Testing utilities for progress reporting.
//!
//! This module provides:
//! - Ready-made reporters and jobs
//! - A sink that always fails
//! - Assertions on rejected reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_rejected, assert_stage_status};
pub use fixtures::{collecting_reporter, three_stage_job, THREE_STAGES};
pub use mocks::FailingProgressSink;
