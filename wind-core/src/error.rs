use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::source::SourceKey;

/// Structured failure taxonomy for the acquisition and extrapolation core.
///
/// Partial-data problems (malformed rows dropped during normalization) are
/// deliberately NOT errors; they are counted in `FetchMetadata::skipped_records`
/// and the fetch still succeeds.
#[derive(Debug, Error)]
pub enum WindError {
    /// A math or request precondition was violated. Surfaced as-is, never clamped.
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Request-shape error, raised before any network I/O.
    #[error("height {height}m is not supported by {key} (supported heights: {supported:?})")]
    UnsupportedHeight {
        key: SourceKey,
        height: u32,
        supported: Vec<u32>,
    },

    /// Request-shape error, raised before any network I/O.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Transport or provider failure, including timeouts. The client never
    /// retries internally; retry-with-backoff belongs to the caller.
    #[error("{key} is unavailable: {reason}")]
    SourceUnavailable {
        key: SourceKey,
        status: Option<u16>,
        reason: String,
    },

    /// A profile-law failure wrapped with the observation it was applied to.
    #[error("extrapolation from {from_height}m to {to_height}m at {timestamp} failed: {cause}")]
    Extrapolation {
        timestamp: DateTime<Utc>,
        from_height: f64,
        to_height: f64,
        #[source]
        cause: Box<WindError>,
    },
}

impl WindError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        WindError::InvalidParameter { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, WindError>;
