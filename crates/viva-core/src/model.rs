//! Core data model types for viva.
//!
//! These are the fundamental types that the entire viva system uses to
//! represent questions, answers, evaluator feedback, and session records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Answer text recorded when the timer expires with nothing typed.
pub const NO_ANSWER_TEXT: &str = "(No answer provided within the time limit)";

/// Question difficulty tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A single interview question. Immutable once issued to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within a deck.
    pub id: String,
    /// The question text spoken and shown to the candidate.
    pub text: String,
    /// Key points a strong answer is expected to touch.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Maximum points the evaluator may award.
    pub points_available: u32,
    /// Seconds the candidate has to answer. Always positive.
    pub time_limit_secs: u64,
}

/// A candidate's answer to one question.
///
/// Created exactly once per question, by explicit submission or by timer
/// expiry (auto-submit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The question this answers.
    pub question_id: String,
    /// Answer text; [`NO_ANSWER_TEXT`] if the timer expired on an empty draft.
    pub text: String,
    /// Self-reported confidence, 0..=100.
    pub confidence_level: u8,
    /// Whole seconds spent, never above the question's time limit.
    pub time_spent_secs: u64,
}

impl Answer {
    /// Whether this answer was synthesized by timer expiry on an empty draft.
    pub fn is_no_answer(&self) -> bool {
        self.text == NO_ANSWER_TEXT
    }
}

/// Evaluator feedback for one answer. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    /// The question this feedback scores.
    pub question_id: String,
    /// Points awarded, clamped by the controller to `points_available`.
    pub points_earned: u32,
    /// Bonus derived from the candidate's confidence level.
    pub confidence_bonus: u32,
    /// Narrative text the narrator speaks back to the candidate.
    pub narrative: String,
}

/// One scored question: the full (question, answer, feedback) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub question: Question,
    pub answer: Answer,
    pub feedback: Feedback,
}

/// The append-only record of one session, in question order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionResult {
    pub entries: Vec<SessionEntry>,
}

impl SessionResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: SessionEntry) {
        self.entries.push(entry);
    }
}

/// Final report derived deterministically from a [`SessionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Sum of points earned plus confidence bonuses across all entries.
    pub total_score: u32,
    /// Fraction of questions answered correctly (>= half points).
    pub correctness_ratio: f64,
    /// EduTokens earned (half the points earned, summed per question).
    pub tokens_earned: u32,
    /// Badges unlocked by threshold rules. A set: no duplicates.
    pub badges: BTreeSet<String>,
}

/// A points credit issued to the reward ledger for a completed session.
///
/// At most one exists per session id; retried issuance returns the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTransaction {
    /// Ledger-assigned transaction id.
    pub id: Uuid,
    /// Idempotency key: the session being credited.
    pub session_id: Uuid,
    /// Points credited.
    pub points_delta: i64,
    /// When the ledger applied the credit.
    pub timestamp: DateTime<Utc>,
}
