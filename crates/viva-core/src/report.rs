//! Session report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{RewardTransaction, SessionResult, SessionSummary};

/// A complete record of one finished session, suitable for archiving and
/// for the `viva report` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// The session this report records.
    pub session_id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the deck the session drew from.
    pub deck: DeckSummary,
    /// Per-question (question, answer, feedback) entries.
    pub entries: SessionResult,
    /// The derived summary.
    pub summary: SessionSummary,
    /// The reward credited, if issuance succeeded.
    pub reward: Option<RewardTransaction>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of a deck (without the full question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

impl SessionReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Difficulty, Feedback, Question, SessionEntry};
    use std::collections::BTreeSet;

    fn sample_report() -> SessionReport {
        SessionReport {
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            deck: DeckSummary {
                id: "edu-tech".into(),
                name: "Educational Technology".into(),
                question_count: 1,
            },
            entries: SessionResult {
                entries: vec![SessionEntry {
                    question: Question {
                        id: "q1".into(),
                        text: "?".into(),
                        key_points: vec!["skills".into()],
                        difficulty: Difficulty::Easy,
                        points_available: 10,
                        time_limit_secs: 60,
                    },
                    answer: Answer {
                        question_id: "q1".into(),
                        text: "my skills".into(),
                        confidence_level: 80,
                        time_spent_secs: 42,
                    },
                    feedback: Feedback {
                        question_id: "q1".into(),
                        points_earned: 8,
                        confidence_bonus: 2,
                        narrative: "Good.".into(),
                    },
                }],
            },
            summary: SessionSummary {
                total_score: 10,
                correctness_ratio: 1.0,
                tokens_earned: 4,
                badges: BTreeSet::new(),
            },
            reward: None,
            duration_ms: 61_000,
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        let report = sample_report();
        report.save_json(&path).unwrap();

        let loaded = SessionReport::load_json(&path).unwrap();
        assert_eq!(loaded.session_id, report.session_id);
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.entries.len(), 1);
    }

    #[test]
    fn load_missing_file_names_the_path() {
        let err = SessionReport::load_json(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/report.json"));
    }
}
