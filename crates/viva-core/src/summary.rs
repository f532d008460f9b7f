//! Session summary building: scoring aggregation and badge rules.
//!
//! [`build_summary`] is a pure function over a finished [`SessionResult`]:
//! deterministic, no side effects, no external calls. The controller invokes
//! it exactly once on entering the terminal Summary phase.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{SessionResult, SessionSummary};

/// A declarative badge threshold, evaluated once over the finished totals.
///
/// A rule awards its badge when every threshold it sets is exceeded
/// (strictly greater).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRule {
    /// Badge name added to the summary's badge set.
    pub name: String,
    /// Awarded only if `total_score` exceeds this.
    #[serde(default)]
    pub score_over: Option<u32>,
    /// Awarded only if `tokens_earned` exceeds this.
    #[serde(default)]
    pub tokens_over: Option<u32>,
}

impl BadgeRule {
    fn matches(&self, total_score: u32, tokens_earned: u32) -> bool {
        self.score_over.map_or(true, |t| total_score > t)
            && self.tokens_over.map_or(true, |t| tokens_earned > t)
    }
}

/// Scoring knobs for the summary builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points-to-tokens divisor: each question yields
    /// `points_earned / token_divisor` tokens (integer division).
    pub token_divisor: u32,
    /// Badge thresholds.
    pub badge_rules: Vec<BadgeRule>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            token_divisor: 2,
            badge_rules: vec![
                BadgeRule {
                    name: "on-target".into(),
                    score_over: Some(20),
                    tokens_over: None,
                },
                BadgeRule {
                    name: "collector".into(),
                    score_over: None,
                    tokens_over: Some(30),
                },
                BadgeRule {
                    name: "focused".into(),
                    score_over: Some(50),
                    tokens_over: None,
                },
            ],
        }
    }
}

/// Fold a finished session's per-question results into a summary.
///
/// A question counts as correct when it earned at least half its available
/// points, ties rounding up. An empty result yields an all-zero summary.
pub fn build_summary(result: &SessionResult, config: &ScoringConfig) -> SessionSummary {
    let mut total_score: u32 = 0;
    let mut tokens_earned: u32 = 0;
    let mut correct: usize = 0;

    for entry in &result.entries {
        total_score += entry.feedback.points_earned + entry.feedback.confidence_bonus;
        tokens_earned += entry.feedback.points_earned / config.token_divisor.max(1);
        // ratio >= 0.5 in integer form, ties round up
        if entry.feedback.points_earned * 2 >= entry.question.points_available {
            correct += 1;
        }
    }

    let correctness_ratio = if result.entries.is_empty() {
        0.0
    } else {
        correct as f64 / result.entries.len() as f64
    };

    let badges: BTreeSet<String> = config
        .badge_rules
        .iter()
        .filter(|rule| rule.matches(total_score, tokens_earned))
        .map(|rule| rule.name.clone())
        .collect();

    SessionSummary {
        total_score,
        correctness_ratio,
        tokens_earned,
        badges,
    }
}
