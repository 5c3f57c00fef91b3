//! Error types for the digest pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by fetching, filtering, aggregating and delivering.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Failed to fetch {request}: {reason}")]
    Fetch { request: String, reason: String },

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication rejected by the events API")]
    Unauthorized,

    #[error("Malformed event {event_id}: missing or invalid `{field}`")]
    MalformedEvent { field: String, event_id: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DigestError {
    /// Build a malformed-event error for the given field.
    pub fn malformed(field: &str, event_id: Option<&str>) -> Self {
        DigestError::MalformedEvent {
            field: field.to_string(),
            event_id: event_id.unwrap_or("<no id>").to_string(),
        }
    }

    /// Whether this error came from a single page request.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            DigestError::Fetch { .. } | DigestError::RateLimited { .. } | DigestError::Unauthorized
        )
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
