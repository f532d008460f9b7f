//! The `viva validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(deck_path: PathBuf) -> Result<()> {
    let decks = if deck_path.is_dir() {
        viva_core::deck::load_deck_directory(&deck_path)?
    } else {
        vec![viva_core::deck::parse_deck(&deck_path)?]
    };

    let mut total_warnings = 0;

    for deck in &decks {
        println!("Deck: {} ({} questions)", deck.name, deck.questions.len());

        let warnings = viva_core::deck::validate_deck(deck);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All decks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
