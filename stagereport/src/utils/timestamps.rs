//! Timestamp helpers for sink messages.

use chrono::{DateTime, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// Returns the current UTC time as an ISO 8601 string.
///
/// Always has microsecond precision and an explicit `+00:00` offset:
/// `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
///
/// # Examples
///
/// ```
/// use stagereport::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Formats a UTC time the same way as [`iso_timestamp`].
#[must_use]
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format(ISO_FORMAT).to_string()
}
