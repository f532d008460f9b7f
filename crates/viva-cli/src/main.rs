//! viva CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "viva", version, about = "Timed interview assessment sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interview session
    Run {
        /// Path to a .toml question deck
        #[arg(long)]
        deck: PathBuf,

        /// Named service from the config (default: config's default_service)
        #[arg(long)]
        service: Option<String>,

        /// Number of questions to ask
        #[arg(long)]
        questions: Option<usize>,

        /// Self-reported confidence level, 0-100
        #[arg(long)]
        confidence: Option<u8>,

        /// Answers file for non-interactive runs (one answer per line)
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Output directory for session reports
        #[arg(long, default_value = "./viva-reports")]
        output: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question deck TOML files
    Validate {
        /// Path to a deck file or directory
        #[arg(long)]
        deck: PathBuf,
    },

    /// Display a saved session report
    Report {
        /// Path to a report JSON file
        #[arg(long)]
        path: PathBuf,
    },

    /// Create starter config and example deck
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("viva=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            deck,
            service,
            questions,
            confidence,
            answers,
            output,
            config,
        } => commands::run::execute(deck, service, questions, confidence, answers, output, config)
            .await,
        Commands::Validate { deck } => commands::validate::execute(deck),
        Commands::Report { path } => commands::report::execute(path),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
