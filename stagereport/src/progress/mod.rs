//! Progress reporting.
//!
//! The [`ProgressReporter`] validates each progress event against the job's
//! registered stages and its previous events, then forwards accepted events
//! to a sink. Per job the protocol moves through
//! `Unregistered -> Registered -> InStage(0) -> ... -> InStage(last)`; there
//! is no explicit completion event.

#[cfg(test)]
mod integration_tests;
mod job;
mod reporter;
mod snapshot;
mod state;

pub use job::JobHandle;
pub use reporter::ProgressReporter;
pub use snapshot::{JobSnapshot, StageSnapshot};
pub use state::JobProgressState;
