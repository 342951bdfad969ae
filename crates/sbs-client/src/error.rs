//! Client error types.

use thiserror::Error;

/// Errors that can occur when talking to the SmileBASIC Source API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The token is missing, expired, or lacks access (401/403).
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// The API returned 429 Too Many Requests.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A listen poll ended without data. Re-poll with the same state.
    #[error("listen poll timed out")]
    PollTimeout,

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The client could not be built from configuration.
    #[error(transparent)]
    Config(#[from] sbs_config::ConfigError),
}

impl ClientError {
    /// Whether re-issuing the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PollTimeout | Self::RateLimited { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized { .. } | Self::Parse(_) | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ClientError::PollTimeout.is_retryable());
        assert!(ClientError::RateLimited { retry_after_secs: 1 }.is_retryable());
        assert!(
            ClientError::Api {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ClientError::Api {
                status: 400,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ClientError::Unauthorized {
                status: 401,
                message: String::new()
            }
            .is_retryable()
        );
    }
}
