//! The `viva report` command: display a saved session report.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use viva_core::report::SessionReport;

pub fn execute(path: PathBuf) -> Result<()> {
    let report = SessionReport::load_json(&path)?;

    println!(
        "Session {} — {} ({} questions asked)",
        report.session_id,
        report.deck.name,
        report.entries.len()
    );
    println!(
        "Recorded {} over {:.1}s",
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration_ms as f64 / 1000.0
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Answer", "Points", "Bonus", "Time"]);
    for (i, entry) in report.entries.entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate(&entry.question.text, 40)),
            Cell::new(truncate(&entry.answer.text, 40)),
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
        report.summary.total_score,
        report.summary.tokens_earned,
        report.summary.correctness_ratio * 100.0
    );
    if !report.summary.badges.is_empty() {
        let badges: Vec<&str> = report.summary.badges.iter().map(String::as_str).collect();
        println!("Badges: {}", badges.join(", "));
    }
    match &report.reward {
        Some(reward) => println!(
            "Reward: {} points credited (transaction {})",
            reward.points_delta, reward.id
        ),
        None => println!("Reward: not issued"),
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut t: String = s.chars().take(max.saturating_sub(3)).collect();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}
