//! Mock collaborators for testing the session controller without real
//! services.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use viva_core::error::SessionError;
use viva_core::model::{Answer, Feedback, Question};
use viva_core::traits::{
    Evaluator, NarratorDirective, NarratorSink, QuestionSource, SessionContext,
};

/// A question source serving a fixed list, with failure injection.
pub struct MockSource {
    questions: Vec<Question>,
    call_count: AtomicU32,
    fail_times: AtomicU32,
}

impl MockSource {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            call_count: AtomicU32::new(0),
            fail_times: AtomicU32::new(0),
        }
    }

    /// Make the next `n` fetches fail with `SourceUnavailable`.
    pub fn fail_next(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn next_question(&self, ctx: &SessionContext) -> Result<Question, SessionError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::SourceUnavailable("mock outage".into()));
        }
        self.questions
            .get(ctx.question_index)
            .cloned()
            .ok_or_else(|| {
                SessionError::SourceUnavailable(format!(
                    "no mock question at index {}",
                    ctx.question_index
                ))
            })
    }
}

/// An evaluator awarding a fixed score, with failure injection and call
/// accounting.
pub struct MockEvaluator {
    points_earned: u32,
    confidence_bonus: u32,
    call_count: AtomicU32,
    fail_times: AtomicU32,
    last_answer: Mutex<Option<Answer>>,
}

impl MockEvaluator {
    /// An evaluator that always awards the same score.
    pub fn with_fixed_score(points_earned: u32, confidence_bonus: u32) -> Self {
        Self {
            points_earned,
            confidence_bonus,
            call_count: AtomicU32::new(0),
            fail_times: AtomicU32::new(0),
            last_answer: Mutex::new(None),
        }
    }

    /// Make the next `n` evaluations fail with `EvaluationFailed`.
    pub fn fail_next(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The last answer submitted for evaluation.
    pub fn last_answer(&self) -> Option<Answer> {
        self.last_answer.lock().unwrap().clone()
    }
}

#[async_trait]
impl Evaluator for MockEvaluator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn evaluate(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> Result<Feedback, SessionError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_answer.lock().unwrap() = Some(answer.clone());
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::EvaluationFailed("mock outage".into()));
        }
        Ok(Feedback {
            question_id: question.id.clone(),
            points_earned: self.points_earned,
            confidence_bonus: self.confidence_bonus,
            narrative: format!("Mock feedback for {}.", question.id),
        })
    }
}

/// A narrator sink that records every directive it receives.
#[derive(Default)]
pub struct RecordingNarrator {
    directives: Mutex<Vec<NarratorDirective>>,
}

impl RecordingNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directives(&self) -> Vec<NarratorDirective> {
        self.directives.lock().unwrap().clone()
    }

    /// Texts of all `Speak` directives, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.directives
            .lock()
            .unwrap()
            .iter()
            .filter_map(|d| match d {
                NarratorDirective::Speak(text) => Some(text.clone()),
                NarratorDirective::Mood(_) => None,
            })
            .collect()
    }
}

impl NarratorSink for RecordingNarrator {
    fn direct(&self, directive: NarratorDirective) {
        self.directives.lock().unwrap().push(directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use viva_core::model::{Difficulty, NO_ANSWER_TEXT};

    fn question() -> Question {
        Question {
            id: "q1".into(),
            text: "?".into(),
            key_points: vec![],
            difficulty: Difficulty::Easy,
            points_available: 10,
            time_limit_secs: 60,
        }
    }

    #[tokio::test]
    async fn mock_source_counts_calls_and_fails_on_demand() {
        let source = MockSource::new(vec![question()]);
        source.fail_next(1);
        let ctx = SessionContext {
            session_id: Uuid::new_v4(),
            deck_id: "d".into(),
            question_index: 0,
        };

        assert!(source.next_question(&ctx).await.is_err());
        assert!(source.next_question(&ctx).await.is_ok());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_evaluator_records_last_answer() {
        let evaluator = MockEvaluator::with_fixed_score(8, 2);
        let answer = Answer {
            question_id: "q1".into(),
            text: NO_ANSWER_TEXT.into(),
            confidence_level: 50,
            time_spent_secs: 60,
        };

        let feedback = evaluator.evaluate(&question(), &answer).await.unwrap();
        assert_eq!(feedback.points_earned, 8);
        assert!(evaluator.last_answer().unwrap().is_no_answer());
    }
}
