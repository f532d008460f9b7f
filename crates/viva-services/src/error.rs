//! Service transport error types.
//!
//! These errors represent failures when talking to the remote interview
//! API. They classify retryability without string matching, then convert
//! into the session-level error for whichever call failed.

use thiserror::Error;

use viva_core::error::SessionError;

/// Errors that can occur when calling a remote service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ServiceError::AuthenticationFailed(_))
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ServiceError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Surface this failure as a question-source error.
    pub fn into_source_error(self) -> SessionError {
        SessionError::SourceUnavailable(self.to_string())
    }

    /// Surface this failure as an evaluation error.
    pub fn into_evaluation_error(self) -> SessionError {
        SessionError::EvaluationFailed(self.to_string())
    }

    /// Surface this failure as a reward-issuance error.
    pub fn into_reward_error(self) -> SessionError {
        SessionError::RewardFailed(self.to_string())
    }
}
