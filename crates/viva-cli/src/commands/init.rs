//! The `viva init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create viva.toml
    if std::path::Path::new("viva.toml").exists() {
        println!("viva.toml already exists, skipping.");
    } else {
        std::fs::write("viva.toml", SAMPLE_CONFIG)?;
        println!("Created viva.toml");
    }

    // Create example deck
    std::fs::create_dir_all("decks")?;
    let example_path = std::path::Path::new("decks/example.toml");
    if example_path.exists() {
        println!("decks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DECK)?;
        println!("Created decks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: viva validate --deck decks/example.toml");
    println!("  2. Run: viva run --deck decks/example.toml");
    println!("  3. For a remote evaluator, edit viva.toml and set VIVA_API_KEY");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# viva configuration

default_service = "local"
total_questions = 5
default_confidence = 50
output_dir = "./viva-reports"

[services.local]
type = "local"

[services.remote]
type = "http"
base_url = "https://interview.example.com/api"
api_key = "${VIVA_API_KEY}"
"#;

const EXAMPLE_DECK: &str = r#"[deck]
id = "example"
name = "Example Interview"
description = "A short example deck to get started"
default_time_limit_secs = 120

[[questions]]
id = "intro"
text = "Tell me about yourself and what draws you to this field."
key_points = ["background", "experience", "motivation"]
difficulty = "easy"
points_available = 10

[[questions]]
id = "challenge"
text = "Describe a challenging problem you solved recently. What made it hard?"
key_points = ["problem", "approach", "outcome", "lessons"]
difficulty = "medium"
points_available = 20

[[questions]]
id = "teamwork"
text = "How do you handle disagreement within a team?"
key_points = ["listening", "communication", "compromise"]
difficulty = "medium"
points_available = 15
"#;
