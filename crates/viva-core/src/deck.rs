//! TOML question deck parser.
//!
//! Loads question decks from TOML files and directories, and validates them.
//! A deck defines *what* a local session asks; how questions are authored is
//! out of scope here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Difficulty, Question};

/// A named, ordered collection of questions.
#[derive(Debug, Clone)]
pub struct Deck {
    /// Unique deck identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description shown before the session starts.
    pub description: String,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Time limit applied to questions that don't set their own.
    pub default_time_limit_secs: u64,
}

/// Intermediate TOML structure for parsing deck files.
#[derive(Debug, Deserialize)]
struct TomlDeckFile {
    deck: TomlDeckHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlDeckHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_time_limit")]
    default_time_limit_secs: u64,
}

fn default_time_limit() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    #[serde(default)]
    key_points: Vec<String>,
    difficulty: String,
    points_available: u32,
    #[serde(default)]
    time_limit_secs: Option<u64>,
}

/// Parse a single TOML file into a `Deck`.
pub fn parse_deck(path: &Path) -> Result<Deck> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read deck file: {}", path.display()))?;

    parse_deck_str(&content, path)
}

/// Parse a TOML string into a `Deck` (useful for testing).
pub fn parse_deck_str(content: &str, source_path: &Path) -> Result<Deck> {
    let parsed: TomlDeckFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_time_limit_secs = parsed.deck.default_time_limit_secs;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let difficulty: Difficulty = q
                .difficulty
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;

            Ok(Question {
                id: q.id,
                text: q.text,
                key_points: q.key_points,
                difficulty,
                points_available: q.points_available,
                time_limit_secs: q.time_limit_secs.unwrap_or(default_time_limit_secs),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Deck {
        id: parsed.deck.id,
        name: parsed.deck.name,
        description: parsed.deck.description,
        questions,
        default_time_limit_secs,
    })
}

/// Recursively load all `.toml` deck files from a directory.
pub fn load_deck_directory(dir: &Path) -> Result<Vec<Deck>> {
    let mut decks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            decks.extend(load_deck_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_deck(&path) {
                Ok(deck) => decks.push(deck),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(decks)
}

/// A warning from deck validation.
#[derive(Debug, Clone)]
pub struct DeckWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a deck for common issues.
pub fn validate_deck(deck: &Deck) -> Vec<DeckWarning> {
    let mut warnings = Vec::new();

    if deck.questions.is_empty() {
        warnings.push(DeckWarning {
            question_id: None,
            message: "deck contains no questions".into(),
        });
    }

    // Duplicate question IDs
    let mut seen_ids = std::collections::HashSet::new();
    for question in &deck.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(DeckWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &deck.questions {
        if question.text.trim().is_empty() {
            warnings.push(DeckWarning {
                question_id: Some(question.id.clone()),
                message: "question text is empty".into(),
            });
        }
        if question.points_available == 0 {
            warnings.push(DeckWarning {
                question_id: Some(question.id.clone()),
                message: "points_available is zero; the question cannot be scored".into(),
            });
        }
        if question.time_limit_secs == 0 {
            warnings.push(DeckWarning {
                question_id: Some(question.id.clone()),
                message: "time_limit_secs must be positive".into(),
            });
        }
        if question.key_points.is_empty() {
            warnings.push(DeckWarning {
                question_id: Some(question.id.clone()),
                message: "no key_points; heuristic evaluation will always score zero".into(),
            });
        }
    }

    warnings
}
