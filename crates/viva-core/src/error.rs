//! Session error types.
//!
//! These errors represent failures a session can surface to its driver.
//! Defined in `viva-core` so the controller can classify errors for retry
//! decisions without string matching. None of them are fatal: a session
//! that cannot progress stays in its current state until the caller
//! retries or abandons it.

use thiserror::Error;

use crate::session::Phase;

/// Errors surfaced by a session or the services it calls.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The question source could not produce the next question.
    #[error("question source unavailable: {0}")]
    SourceUnavailable(String),

    /// The evaluator was unreachable or returned a malformed response.
    /// The submitted answer is preserved so a retry needs no re-typing.
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The answer was rejected locally before any network call.
    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    /// The reward ledger call failed. The summary is retained so
    /// issuance can be retried without recomputing scores.
    #[error("reward issuance failed: {0}")]
    RewardFailed(String),

    /// The operation is not valid in the session's current phase.
    #[error("operation requires the {expected} phase, session is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// The session was abandoned; no further transitions fire.
    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    /// Returns `true` if retrying the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SourceUnavailable(_)
                | SessionError::EvaluationFailed(_)
                | SessionError::RewardFailed(_)
        )
    }
}
