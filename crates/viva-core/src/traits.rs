//! Trait definitions for the session's external collaborators.
//!
//! The controller only ever talks to the outside world through these four
//! seams: questions come from a [`QuestionSource`], answers are scored by an
//! [`Evaluator`], points are credited through a [`RewardLedger`], and
//! presentation is driven by discrete directives sent to a [`NarratorSink`].
//! Implementations live in the `viva-services` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{Answer, Feedback, Question, RewardTransaction};

/// Per-call context handed to the question source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// The running session.
    pub session_id: Uuid,
    /// Deck or course the session draws questions from.
    pub deck_id: String,
    /// Zero-based index of the question being requested.
    pub question_index: usize,
}

/// Supplies the next question for a session.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name (e.g. "http", "deck").
    fn name(&self) -> &str;

    /// Fetch the question at `ctx.question_index`.
    ///
    /// Fails with [`SessionError::SourceUnavailable`]; the controller
    /// surfaces the error and the caller retries on demand.
    async fn next_question(&self, ctx: &SessionContext) -> Result<Question, SessionError>;
}

/// Scores a submitted answer and returns feedback.
///
/// Implementations must be side-effect free beyond returning a score, so a
/// failed call is always safe to retry.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Human-readable evaluator name.
    fn name(&self) -> &str;

    /// Score `answer` against `question`.
    async fn evaluate(&self, question: &Question, answer: &Answer)
        -> Result<Feedback, SessionError>;
}

/// Credits points to a user account, idempotently by session id.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    /// Credit `points_delta` for `session_id`.
    ///
    /// A second call with the same `session_id` must return the prior
    /// transaction unchanged rather than double-crediting.
    async fn credit(
        &self,
        session_id: Uuid,
        points_delta: i64,
    ) -> Result<RewardTransaction, SessionError>;
}

/// Avatar mood shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Neutral,
    Pleased,
    Concerned,
}

/// An outbound presentation instruction.
///
/// Plain values, never closures: the core carries no dependency on any
/// rendering framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum NarratorDirective {
    /// Speak the given text aloud.
    Speak(String),
    /// Switch the avatar to the given mood.
    Mood(Mood),
}

/// Receives narrator directives. Fire-and-forget: the core never awaits or
/// depends on delivery.
pub trait NarratorSink: Send + Sync {
    fn direct(&self, directive: NarratorDirective);
}

/// A sink that discards every directive. Useful headless.
pub struct NullNarrator;

impl NarratorSink for NullNarrator {
    fn direct(&self, _: NarratorDirective) {}
}
