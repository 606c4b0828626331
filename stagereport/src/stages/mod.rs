//! Stage registry.
//!
//! A job declares its ordered stage list exactly once, before reporting any
//! progress. The registry hands out immutable [`StageSet`]s keyed by job.

mod registry;
mod set;

pub use registry::StageRegistry;
pub use set::{Stage, StageSet};
