//! Identifier generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a fresh job id string.
#[must_use]
pub fn generate_job_id() -> String {
    generate_uuid().to_string()
}
