//! Session controller: the state machine driving one assessment session.
//!
//! One controller owns one session end to end: it fetches questions, arms
//! the countdown clock, accepts or auto-submits answers, calls the
//! evaluator, appends results, and on the terminal Summary phase builds the
//! summary, issues the reward, and emits the closing narration.
//!
//! Concurrency model: every transition takes `&mut self`, so at most one
//! operation is in flight per session. Independent sessions are independent
//! values. The submit/expiry race is resolved by a set-once claim guard plus
//! a synchronous clock disarm; the loser's event arrives stale and is a
//! no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::clock::{Clock, ClockEvent};
use crate::error::SessionError;
use crate::model::{
    Answer, Feedback, Question, RewardTransaction, SessionEntry, SessionResult, SessionSummary,
    NO_ANSWER_TEXT,
};
use crate::summary::{build_summary, ScoringConfig};
use crate::traits::{
    Evaluator, Mood, NarratorDirective, NarratorSink, QuestionSource, RewardLedger, SessionContext,
};

/// Spoken when the session starts, before the first question.
const INTRO_NARRATION: &str = "Let's begin the interview. I'll ask you a series \
of questions about this course material. Take your time and answer thoughtfully.";

/// Session phases. `Intro` and `Summary` are non-repeating; the
/// `Question -> Evaluating -> Feedback` loop runs once per question index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intro,
    Question,
    Evaluating,
    Feedback,
    Summary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Intro => write!(f, "intro"),
            Phase::Question => write!(f, "question"),
            Phase::Evaluating => write!(f, "evaluating"),
            Phase::Feedback => write!(f, "feedback"),
            Phase::Summary => write!(f, "summary"),
        }
    }
}

/// Mood cut-offs over the per-question score ratio.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MoodThresholds {
    /// Ratio above which the narrator looks pleased.
    pub pleased: f64,
    /// Ratio above which the narrator stays neutral.
    pub neutral: f64,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self {
            pleased: 0.7,
            neutral: 0.4,
        }
    }
}

impl MoodThresholds {
    pub fn mood_for(&self, ratio: f64) -> Mood {
        if ratio > self.pleased {
            Mood::Pleased
        } else if ratio > self.neutral {
            Mood::Neutral
        } else {
            Mood::Concerned
        }
    }
}

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deck or course the question source draws from.
    pub deck_id: String,
    /// How many questions the session asks.
    pub total_questions: usize,
    /// Confidence level assumed when the candidate never set one.
    pub default_confidence: u8,
    /// Mood cut-offs for feedback narration.
    pub mood: MoodThresholds,
    /// Scoring thresholds for the summary builder.
    pub scoring: ScoringConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deck_id: String::new(),
            total_questions: 5,
            default_confidence: 50,
            mood: MoodThresholds::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Read-only view of a session's state, handed to observers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub question_index: usize,
    pub total_questions: usize,
    pub score: u32,
    pub tokens_earned: u32,
}

/// Observer for presentation layers that want state, not directives.
///
/// Callbacks receive read-only values; observers never mutate the session.
pub trait SessionObserver: Send + Sync {
    fn on_phase_change(&self, snapshot: &SessionSnapshot);
    fn on_feedback(&self, entry: &SessionEntry);
    fn on_summary(&self, summary: &SessionSummary);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_phase_change(&self, _: &SessionSnapshot) {}
    fn on_feedback(&self, _: &SessionEntry) {}
    fn on_summary(&self, _: &SessionSummary) {}
}

/// What a clock event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Stale, out-of-phase, or already-claimed event; nothing changed.
    Ignored,
    /// A live countdown second elapsed.
    Ticked { remaining_secs: u64 },
    /// The timer expired and the draft was auto-submitted.
    AutoSubmitted,
}

/// Handle for tearing down a session from outside the driver.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Abandon the session: no transition fires after this is observed,
    /// and in-flight service results are discarded on arrival.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// The session controller.
pub struct SessionController {
    id: Uuid,
    config: SessionConfig,
    phase: Phase,
    index: usize,
    current_question: Option<Question>,
    draft_text: String,
    draft_confidence: u8,
    /// Set-once guard for the current question: whichever of explicit
    /// submit or timer expiry observes it first wins the race.
    claimed: bool,
    /// Answer preserved across a failed evaluation so a retry needs no
    /// re-typing.
    pending_answer: Option<Answer>,
    results: SessionResult,
    summary: Option<SessionSummary>,
    reward: Option<RewardTransaction>,
    started_at: Instant,
    cancelled: Arc<AtomicBool>,
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    evaluator: Arc<dyn Evaluator>,
    ledger: Arc<dyn RewardLedger>,
    narrator: Arc<dyn NarratorSink>,
    observer: Box<dyn SessionObserver>,
}

impl SessionController {
    /// Create a controller in the `Intro` phase, plus the receiving end of
    /// its clock's event channel for the driver to poll.
    pub fn new(
        config: SessionConfig,
        source: Arc<dyn QuestionSource>,
        evaluator: Arc<dyn Evaluator>,
        ledger: Arc<dyn RewardLedger>,
        narrator: Arc<dyn NarratorSink>,
    ) -> (Self, mpsc::UnboundedReceiver<ClockEvent>) {
        let (clock, clock_rx) = Clock::new();
        let default_confidence = config.default_confidence.min(100);
        (
            Self {
                id: Uuid::new_v4(),
                config,
                phase: Phase::Intro,
                index: 0,
                current_question: None,
                draft_text: String::new(),
                draft_confidence: default_confidence,
                claimed: false,
                pending_answer: None,
                results: SessionResult::default(),
                summary: None,
                reward: None,
                started_at: Instant::now(),
                cancelled: Arc::new(AtomicBool::new(false)),
                clock,
                source,
                evaluator,
                ledger,
                narrator,
                observer: Box::new(NoopObserver),
            },
            clock_rx,
        )
    }

    /// Replace the no-op observer.
    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn question_index(&self) -> usize {
        self.index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn results(&self) -> &SessionResult {
        &self.results
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn reward(&self) -> Option<&RewardTransaction> {
        self.reward.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wall-clock milliseconds since the controller was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Read-only state for presentation layers.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut score = 0u32;
        let mut tokens = 0u32;
        for entry in &self.results.entries {
            score += entry.feedback.points_earned + entry.feedback.confidence_bonus;
            tokens += entry.feedback.points_earned / self.config.scoring.token_divisor.max(1);
        }
        SessionSnapshot {
            session_id: self.id,
            phase: self.phase,
            question_index: self.index,
            total_questions: self.config.total_questions,
            score,
            tokens_earned: tokens,
        }
    }

    /// Handle usable from another task (or a signal handler) to tear the
    /// session down mid-flight.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Abandon the session. The clock is disarmed and every later
    /// transition fails with [`SessionError::Cancelled`]. No reward is
    /// issued for an abandoned session.
    pub fn abandon(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.clock.disarm();
    }

    /// `Intro -> Question(0)`: fetch the first question, arm the clock,
    /// narrate the intro and the question. On source failure the session
    /// stays in `Intro` and `start` can be called again.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_phase(Phase::Intro)?;
        self.narrator
            .direct(NarratorDirective::Speak(INTRO_NARRATION.to_string()));
        self.fetch_and_ask(0).await
    }

    /// Record in-progress answer text so a timeout auto-submits what was
    /// typed. Ignored outside the `Question` phase; never a transition.
    pub fn update_draft(&mut self, text: &str, confidence_level: u8) {
        if self.phase == Phase::Question && !self.claimed {
            self.draft_text = text.to_string();
            self.draft_confidence = confidence_level.min(100);
        }
    }

    /// `Question(i) -> Evaluating(i)` by explicit submission.
    ///
    /// Empty answers are rejected locally with [`SessionError::InvalidAnswer`]
    /// before any network call; the clock keeps running and the question can
    /// still be answered.
    pub async fn submit(&mut self, text: &str, confidence_level: u8) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_phase(Phase::Question)?;
        if self.claimed {
            // The timer already claimed this question.
            return Err(SessionError::WrongPhase {
                expected: Phase::Question,
                actual: self.phase,
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidAnswer(
                "answer text must not be empty".into(),
            ));
        }

        let question = self.question_invariant()?;
        // Win the race first: later expiry events are stale by generation.
        self.claimed = true;
        let time_spent = self.clock.elapsed_secs().min(question.time_limit_secs);
        self.clock.disarm();

        let answer = Answer {
            question_id: question.id.clone(),
            text: text.to_string(),
            confidence_level: confidence_level.min(100),
            time_spent_secs: time_spent,
        };
        self.evaluate_answer(answer).await
    }

    /// Feed one clock event through the state machine.
    ///
    /// Only a live `Expired` event in an unclaimed `Question` phase causes a
    /// transition: the draft (or the no-answer sentinel) is auto-submitted
    /// with `time_spent` pinned to the full limit.
    pub async fn handle_clock(&mut self, event: ClockEvent) -> Result<ClockOutcome, SessionError> {
        self.ensure_live()?;
        match event {
            ClockEvent::Tick { remaining_secs } => {
                if self.phase == Phase::Question && !self.claimed {
                    Ok(ClockOutcome::Ticked { remaining_secs })
                } else {
                    Ok(ClockOutcome::Ignored)
                }
            }
            ClockEvent::Expired { generation } => {
                if generation != self.clock.generation()
                    || self.phase != Phase::Question
                    || self.claimed
                {
                    tracing::debug!(session = %self.id, "ignoring stale clock expiry");
                    return Ok(ClockOutcome::Ignored);
                }
                let question = self.question_invariant()?;
                self.claimed = true;
                self.clock.disarm();

                let text = if self.draft_text.trim().is_empty() {
                    NO_ANSWER_TEXT.to_string()
                } else {
                    self.draft_text.trim().to_string()
                };
                let answer = Answer {
                    question_id: question.id.clone(),
                    text,
                    confidence_level: self.draft_confidence,
                    time_spent_secs: question.time_limit_secs,
                };
                self.evaluate_answer(answer).await?;
                Ok(ClockOutcome::AutoSubmitted)
            }
        }
    }

    /// Retry a failed evaluation with the preserved answer. Valid only in
    /// the `Evaluating` phase.
    pub async fn retry_evaluation(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_phase(Phase::Evaluating)?;
        self.run_evaluation().await
    }

    /// `Feedback(i) -> Question(i+1)`, or `-> Summary` past the last index.
    pub async fn advance(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_phase(Phase::Feedback)?;
        let next = self.index + 1;
        if next < self.config.total_questions {
            self.fetch_and_ask(next).await
        } else {
            self.finish().await
        }
    }

    /// Retry reward issuance after a ledger failure. The summary was
    /// retained, so nothing is recomputed. A no-op if the reward already
    /// landed.
    pub async fn retry_reward(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_phase(Phase::Summary)?;
        if self.reward.is_some() {
            return Ok(());
        }
        self.issue_reward().await
    }

    // --- internals -------------------------------------------------------

    fn ensure_live(&mut self) -> Result<(), SessionError> {
        if self.cancelled.load(Ordering::SeqCst) {
            self.clock.disarm();
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    fn ensure_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn question_invariant(&self) -> Result<Question, SessionError> {
        self.current_question
            .clone()
            .ok_or(SessionError::WrongPhase {
                expected: Phase::Question,
                actual: self.phase,
            })
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(session = %self.id, from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
        let snapshot = self.snapshot();
        self.observer.on_phase_change(&snapshot);
    }

    /// Fetch question `index` and present it. State is only mutated after
    /// the source call succeeds, so a failure leaves the session exactly
    /// where it was and the same call can be retried.
    async fn fetch_and_ask(&mut self, index: usize) -> Result<(), SessionError> {
        let ctx = SessionContext {
            session_id: self.id,
            deck_id: self.config.deck_id.clone(),
            question_index: index,
        };
        let question = self.source.next_question(&ctx).await?;
        self.ensure_live()?;

        self.index = index;
        self.clock.arm(question.time_limit_secs);
        self.claimed = false;
        self.draft_text.clear();
        self.draft_confidence = self.config.default_confidence.min(100);
        self.narrator.direct(NarratorDirective::Mood(Mood::Neutral));
        self.narrator
            .direct(NarratorDirective::Speak(question.text.clone()));
        self.current_question = Some(question);
        self.set_phase(Phase::Question);
        Ok(())
    }

    async fn evaluate_answer(&mut self, answer: Answer) -> Result<(), SessionError> {
        self.pending_answer = Some(answer);
        self.set_phase(Phase::Evaluating);
        self.run_evaluation().await
    }

    /// Call the evaluator for the pending answer. On failure the phase
    /// stays `Evaluating` with the answer preserved; the clock is already
    /// disarmed, so no duplicate submission can race the retry.
    async fn run_evaluation(&mut self) -> Result<(), SessionError> {
        let question = self.question_invariant()?;
        let answer = self
            .pending_answer
            .clone()
            .ok_or(SessionError::WrongPhase {
                expected: Phase::Evaluating,
                actual: self.phase,
            })?;

        let feedback = self.evaluator.evaluate(&question, &answer).await?;
        self.ensure_live()?;

        // Never trust the evaluator past the question's ceiling.
        let feedback = Feedback {
            points_earned: feedback.points_earned.min(question.points_available),
            ..feedback
        };

        let ratio = if question.points_available == 0 {
            0.0
        } else {
            feedback.points_earned as f64 / question.points_available as f64
        };
        self.narrator
            .direct(NarratorDirective::Mood(self.config.mood.mood_for(ratio)));
        self.narrator
            .direct(NarratorDirective::Speak(feedback.narrative.clone()));

        debug_assert!(self.results.len() < self.config.total_questions);
        self.results.push(SessionEntry {
            question,
            answer,
            feedback,
        });
        if let Some(entry) = self.results.entries.last() {
            self.observer.on_feedback(entry);
        }
        self.pending_answer = None;
        self.set_phase(Phase::Feedback);
        Ok(())
    }

    /// Terminal entry: build the summary, then issue the reward, then emit
    /// the closing narration. Runs exactly once per session.
    async fn finish(&mut self) -> Result<(), SessionError> {
        let summary = build_summary(&self.results, &self.config.scoring);
        self.observer.on_summary(&summary);
        self.summary = Some(summary);
        self.set_phase(Phase::Summary);
        self.issue_reward().await
    }

    async fn issue_reward(&mut self) -> Result<(), SessionError> {
        let summary = self.summary.clone().ok_or(SessionError::WrongPhase {
            expected: Phase::Summary,
            actual: self.phase,
        })?;
        let transaction = self
            .ledger
            .credit(self.id, summary.total_score as i64)
            .await?;
        self.ensure_live()?;
        self.reward = Some(transaction);

        let correct =
            (summary.correctness_ratio * self.results.len() as f64).round() as usize;
        self.narrator.direct(NarratorDirective::Mood(
            self.config.mood.mood_for(summary.correctness_ratio),
        ));
        self.narrator.direct(NarratorDirective::Speak(format!(
            "You've completed the interview! You answered {correct} questions \
correctly and earned {} points.",
            summary.total_score
        )));
        Ok(())
    }
}
