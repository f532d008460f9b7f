//! The `viva run` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncBufReadExt;

use viva_core::deck::parse_deck;
use viva_core::error::SessionError;
use viva_core::model::{SessionEntry, NO_ANSWER_TEXT};
use viva_core::report::{DeckSummary, SessionReport};
use viva_core::session::{ClockOutcome, Phase, SessionConfig, SessionController};
use viva_core::traits::{Mood, NarratorDirective, NarratorSink};
use viva_services::config::{create_service, load_config_from};
use viva_services::ledger::InMemoryLedger;

/// Narrator that prints directives to the console.
struct ConsoleNarrator;

impl NarratorSink for ConsoleNarrator {
    fn direct(&self, directive: NarratorDirective) {
        match directive {
            NarratorDirective::Speak(text) => println!("\n{text}"),
            NarratorDirective::Mood(mood) => {
                let face = match mood {
                    Mood::Pleased => ":)",
                    Mood::Neutral => ":|",
                    Mood::Concerned => ":(",
                };
                println!("[{face}]");
            }
        }
    }
}

pub async fn execute(
    deck_path: PathBuf,
    service_name: Option<String>,
    questions: Option<usize>,
    confidence: Option<u8>,
    answers_path: Option<PathBuf>,
    output: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let deck = parse_deck(&deck_path)?;
    anyhow::ensure!(!deck.questions.is_empty(), "deck has no questions");

    let service_name = service_name.unwrap_or_else(|| config.default_service.clone());
    let service_config = config.services.get(&service_name).with_context(|| {
        format!(
            "service '{}' not found in config. Available: {:?}",
            service_name,
            config.services.keys().collect::<Vec<_>>()
        )
    })?;
    let (source, evaluator) = create_service(service_config, Some(deck.clone()))?;

    let total_questions = questions
        .unwrap_or(config.total_questions)
        .min(deck.questions.len())
        .max(1);
    let confidence = confidence.unwrap_or(config.default_confidence).min(100);

    let session_config = SessionConfig {
        deck_id: deck.id.clone(),
        total_questions,
        default_confidence: confidence,
        ..SessionConfig::default()
    };

    let ledger = Arc::new(InMemoryLedger::new());
    let (mut controller, mut clock_rx) = SessionController::new(
        session_config,
        source,
        evaluator,
        ledger,
        Arc::new(ConsoleNarrator),
    );

    println!("{} — {}", deck.name, deck.description);
    println!("{total_questions} questions. Answer each before its timer runs out.");

    // Ctrl-C abandons the session instead of killing the process mid-write.
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    controller.start().await?;

    let outcome = match answers_path {
        Some(path) => {
            let script = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read answers file: {}", path.display()))?;
            drive_scripted(&mut controller, &script, confidence).await
        }
        None => drive_interactive(&mut controller, &mut clock_rx, confidence).await,
    };

    match outcome {
        Ok(()) => {}
        Err(SessionError::Cancelled) => {
            println!("\nSession abandoned.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let summary = controller
        .summary()
        .cloned()
        .context("session finished without a summary")?;
    print_summary_table(controller.results().entries.as_slice(), &summary);

    let report = SessionReport {
        session_id: controller.id(),
        created_at: chrono::Utc::now(),
        deck: DeckSummary {
            id: deck.id.clone(),
            name: deck.name.clone(),
            question_count: deck.questions.len(),
        },
        entries: controller.results().clone(),
        summary,
        reward: controller.reward().cloned(),
        duration_ms: controller.elapsed_ms(),
    };

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let report_path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&report_path)?;
    eprintln!("Report saved to: {}", report_path.display());

    Ok(())
}

/// Drive the session from an answers file, one line per question. Blank
/// lines stand in for letting the timer run out.
async fn drive_scripted(
    controller: &mut SessionController,
    script: &str,
    confidence: u8,
) -> Result<(), SessionError> {
    let mut answers = script.lines();
    let mut retries = 0u32;

    while controller.phase() != Phase::Summary {
        let step = match controller.phase() {
            Phase::Question => {
                let text = answers.next().unwrap_or("").trim();
                let text = if text.is_empty() { NO_ANSWER_TEXT } else { text };
                controller.submit(text, confidence).await
            }
            Phase::Feedback => controller.advance().await,
            Phase::Evaluating => controller.retry_evaluation().await,
            Phase::Intro | Phase::Summary => break,
        };

        match step {
            Ok(()) => retries = 0,
            Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                retries += 1;
                eprintln!("  Transient failure, retrying ({retries}/{MAX_RETRIES}): {e}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

const MAX_RETRIES: u32 = 3;

/// Drive the session from stdin, racing each answer against the clock.
async fn drive_interactive(
    controller: &mut SessionController,
    clock_rx: &mut tokio::sync::mpsc::UnboundedReceiver<viva_core::clock::ClockEvent>,
    confidence: u8,
) -> Result<(), SessionError> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut retries = 0u32;

    while controller.phase() != Phase::Summary {
        match controller.phase() {
            Phase::Question => {
                tokio::select! {
                    line = lines.next_line() => {
                        let line = line.map_err(|e| {
                            SessionError::InvalidAnswer(format!("failed to read stdin: {e}"))
                        })?;
                        // EOF: let the timer finish the question.
                        let Some(line) = line else { continue };
                        match controller.submit(&line, confidence).await {
                            Ok(()) => retries = 0,
                            Err(SessionError::InvalidAnswer(msg)) => {
                                eprintln!("{msg}");
                            }
                            Err(e) if e.is_retryable() => {
                                eprintln!("  {e}");
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    event = clock_rx.recv() => {
                        let Some(event) = event else { continue };
                        match controller.handle_clock(event).await? {
                            ClockOutcome::Ticked { remaining_secs }
                                if remaining_secs > 0 && remaining_secs % 15 == 0 =>
                            {
                                eprintln!("  ({remaining_secs}s remaining)");
                            }
                            ClockOutcome::AutoSubmitted => {
                                eprintln!("  Time's up.");
                            }
                            _ => {}
                        }
                    }
                }
            }
            Phase::Feedback => {
                if let Some(entry) = controller.results().entries.last() {
                    print_feedback(entry);
                }
                match controller.advance().await {
                    Ok(()) => retries = 0,
                    Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                        retries += 1;
                        eprintln!("  Transient failure, retrying ({retries}/{MAX_RETRIES}): {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Phase::Evaluating => {
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(SessionError::EvaluationFailed(
                        "evaluation kept failing after retries".into(),
                    ));
                }
                eprintln!("  Evaluation failed, retrying ({retries}/{MAX_RETRIES})...");
                if let Err(e) = controller.retry_evaluation().await {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                }
            }
            Phase::Intro | Phase::Summary => break,
        }
    }
    Ok(())
}

fn print_feedback(entry: &SessionEntry) {
    println!(
        "  Scored {}/{} (+{} bonus) in {}s",
        entry.feedback.points_earned,
        entry.question.points_available,
        entry.feedback.confidence_bonus,
        entry.answer.time_spent_secs,
    );
}

fn print_summary_table(entries: &[SessionEntry], summary: &viva_core::model::SessionSummary) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Points", "Bonus", "Time"]);

    for (i, entry) in entries.iter().enumerate() {
        let mut text: String = entry.question.text.chars().take(48).collect();
        if text.len() < entry.question.text.len() {
            text.push_str("...");
        }
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(text),
            Cell::new(format!(
                "{}/{}",
                entry.feedback.points_earned, entry.question.points_available
            )),
            Cell::new(entry.feedback.confidence_bonus),
            Cell::new(format!("{}s", entry.answer.time_spent_secs)),
        ]);
    }

    println!("\n{table}");
    println!(
        "Score: {}  Tokens: {}  Correct: {:.0}%",
        summary.total_score,
        summary.tokens_earned,
        summary.correctness_ratio * 100.0
    );
    if !summary.badges.is_empty() {
        let badges: Vec<&str> = summary.badges.iter().map(String::as_str).collect();
        println!("Badges: {}", badges.join(", "));
    }
}
