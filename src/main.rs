use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod gemini;
mod models;
mod parse;
mod pipeline;
mod report;
mod store;
mod trend;

use config::BackendConfig;
use gemini::GeminiBackend;
use store::TrendStore;

#[derive(Parser)]
#[command(name = "feedback-intelligence")]
#[command(about = "Classifies free-text feedback and tracks persistent negative trends", long_about = None)]
struct Cli {
    /// Path of the analysis history log
    #[arg(long, default_value = "data/analyses.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single feedback text and report negative trends
    Analyze {
        text: String,
    },
    /// Classify every row of the `feedback` column in a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown report from the retained history
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show how much history is retained and when it was last updated
    Status,
    /// Drop the retained history
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut store = TrendStore::open(&cli.store);

    match cli.command {
        Commands::Analyze { text } => {
            let backend = GeminiBackend::new(BackendConfig::from_env())?;
            let outcome = match pipeline::analyze_and_track(&backend, &mut store, &text).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    let hint = describe_failure(&err);
                    return Err(anyhow::Error::new(err).context(hint));
                }
            };

            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
            if outcome.trends.is_empty() {
                println!("No continuous negative trends.");
            } else {
                println!("Continuous negative trends:");
                for entry in &outcome.trends {
                    println!(
                        "- {}: {} consecutive negative cycles ({} priority, score {}/100)",
                        entry.category,
                        entry.consecutive_negative_cycles,
                        entry.priority,
                        entry.current_sentiment_score
                    );
                }
            }
        }
        Commands::Import { csv } => {
            let backend = GeminiBackend::new(BackendConfig::from_env())?;
            let feedbacks = read_feedback_column(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            if feedbacks.is_empty() {
                println!("No feedback rows found in {}.", csv.display());
                return Ok(());
            }

            let batch = pipeline::analyze_batch(&backend, &mut store, &feedbacks).await;
            println!("{}", serde_json::to_string_pretty(&batch)?);
            println!(
                "Processed {} of {} rows ({} failed).",
                batch.processed,
                batch.results.len(),
                batch.failed
            );
        }
        Commands::Report { out } => {
            let history = store.recent()?;
            std::fs::write(&out, report::build_report(&history))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Status => {
            let history = store.recent()?;
            match history.last() {
                Some(latest) => println!(
                    "{} analyses retained, last recorded {}.",
                    history.len(),
                    latest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => println!("No analyses recorded yet."),
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("History cleared.");
        }
    }

    Ok(())
}

/// Operator-facing summary of a failed classification, so a credential
/// problem, a backend outage, and a misbehaving model stay distinguishable.
fn describe_failure(err: &error::AnalysisError) -> String {
    use error::AnalysisError;

    match err {
        AnalysisError::Configuration(_) => {
            "backend credential problem; set GEMINI_API_KEY".to_string()
        }
        AnalysisError::InvocationExhausted(_) | AnalysisError::Transport(_) => {
            "backend is unreachable; verify your API key and connectivity".to_string()
        }
        AnalysisError::EmptyResponse => "the model returned no usable output".to_string(),
        AnalysisError::Schema(violation) => format!(
            "the model ignored the output instructions (field `{}`)",
            violation.field().unwrap_or("response")
        ),
        AnalysisError::Discovery(_) | AnalysisError::Io(_) | AnalysisError::Storage(_) => {
            "analysis could not be completed".to_string()
        }
    }
}

/// Pull non-empty values from the `feedback` column. Form exports vary header
/// casing, so the column is matched case-insensitively.
fn read_feedback_column(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case("feedback"))
        .context("CSV has no `feedback` column")?;

    let mut feedbacks = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result?;
        match row.get(column).map(str::trim) {
            Some(value) if !value.is_empty() => feedbacks.push(value.to_string()),
            _ => tracing::warn!("row {}: feedback column is empty, skipping", index + 1),
        }
    }
    Ok(feedbacks)
}
