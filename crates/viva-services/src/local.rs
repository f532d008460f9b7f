//! Local, offline implementations: a deck-backed question source and a
//! key-point heuristic evaluator.
//!
//! The heuristic scores the fraction of a question's key points mentioned
//! in the answer. It is deliberately one pluggable `Evaluator` among
//! others, not the scoring rule of the system.

use async_trait::async_trait;

use viva_core::deck::Deck;
use viva_core::error::SessionError;
use viva_core::model::{Answer, Feedback, Question};
use viva_core::traits::{Evaluator, QuestionSource, SessionContext};

/// Serves a parsed deck's questions in order.
pub struct DeckSource {
    deck: Deck,
}

impl DeckSource {
    pub fn new(deck: Deck) -> Self {
        Self { deck }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }
}

#[async_trait]
impl QuestionSource for DeckSource {
    fn name(&self) -> &str {
        "deck"
    }

    async fn next_question(&self, ctx: &SessionContext) -> Result<Question, SessionError> {
        self.deck
            .questions
            .get(ctx.question_index)
            .cloned()
            .ok_or_else(|| {
                SessionError::SourceUnavailable(format!(
                    "deck '{}' has no question at index {}",
                    self.deck.id, ctx.question_index
                ))
            })
    }
}

/// Deterministic evaluator: points scale with the fraction of key points
/// the answer mentions; the confidence bonus is one tenth of the
/// candidate's confidence level.
pub struct KeyPointEvaluator;

impl KeyPointEvaluator {
    fn narrative_for(percentage: u32) -> String {
        if percentage > 80 {
            "Excellent response! You addressed most of the key points clearly and professionally."
        } else if percentage > 60 {
            "Good response. You covered some important aspects, but there's room for improvement."
        } else {
            "Your response needs work. Consider addressing more of the key points next time."
        }
        .to_string()
    }
}

#[async_trait]
impl Evaluator for KeyPointEvaluator {
    fn name(&self) -> &str {
        "key-point"
    }

    async fn evaluate(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> Result<Feedback, SessionError> {
        if answer.is_no_answer() || answer.text.trim().is_empty() {
            return Ok(Feedback {
                question_id: question.id.clone(),
                points_earned: 0,
                confidence_bonus: 0,
                narrative: Self::narrative_for(0),
            });
        }

        let haystack = answer.text.to_lowercase();
        let total = question.key_points.len() as u32;
        let matched = question
            .key_points
            .iter()
            .filter(|kp| haystack.contains(&kp.to_lowercase()))
            .count() as u32;

        let points_earned = if total == 0 {
            0
        } else {
            question.points_available * matched / total
        };
        let confidence_bonus = u32::from(answer.confidence_level) / 10;
        let percentage = if question.points_available == 0 {
            0
        } else {
            points_earned * 100 / question.points_available
        };

        Ok(Feedback {
            question_id: question.id.clone(),
            points_earned,
            confidence_bonus,
            narrative: Self::narrative_for(percentage),
        })
    }
}
