//! Completion error taxonomy.
//!
//! Every failure kind the consumed API can produce is a distinct
//! variant, surfaced to the caller unmodified. Only [`GenError::Timeout`]
//! and [`GenError::Network`] are transient; nothing else is ever retried.

use thiserror::Error;

/// Errors that can occur while talking to the completion service.
#[derive(Debug, Error)]
pub enum GenError {
    /// Missing or rejected API key (HTTP 401/403). Never retried.
    #[error("authentication rejected by completion service: {0}")]
    Auth(String),

    /// Rate limit hit (HTTP 429). Surfaced, not retried by default.
    #[error("completion service rate limit: {0}")]
    RateLimit(String),

    /// The request exceeded the configured hard timeout.
    #[error("completion request timed out after {0}ms")]
    Timeout(u64),

    /// Connection or transport failure before a response arrived.
    #[error("network failure reaching completion service: {0}")]
    Network(String),

    /// The service answered with a non-auth, non-rate-limit error status.
    #[error("completion service error (HTTP {status}): {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// A success response whose body did not contain generated text.
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// All transient retry attempts exhausted.
    #[error("all completion retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total attempts performed.
        attempts: u32,
        /// The last transient error seen.
        last_error: String,
    },
}

impl GenError {
    /// Whether this failure kind is eligible for the bounded retry loop.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenError::Timeout(0)
        } else {
            GenError::Network(err.to_string())
        }
    }
}

/// Map an HTTP error status (plus body) to the typed taxonomy.
#[must_use]
pub fn from_status(status: reqwest::StatusCode, body: String) -> GenError {
    match status.as_u16() {
        401 | 403 => GenError::Auth(body),
        429 => GenError::RateLimit(body),
        code => GenError::Service {
            status: code,
            message: body,
        },
    }
}
