//! Core domain model types.
//!
//! This module contains the fundamental types shared by the registry, the
//! reporter and the sinks:
//! - Job identity
//! - Fractions and progress events
//! - Observer-side stage status

mod event;
mod fraction;
mod identity;
mod status;

pub use event::{ProgressEvent, ProgressUpdate, SinkMessage};
pub use fraction::Fraction;
pub use identity::JobId;
pub use status::StageStatus;
