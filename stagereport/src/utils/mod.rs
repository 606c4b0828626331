//! Utility functions for identifier generation and timestamp handling.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{format_iso8601, iso_timestamp};
pub use uuid_utils::{generate_job_id, generate_uuid};
