//! # warroom-cli
//!
//! Binary entry point for the War Room message bus.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - The `warroom serve` command starting the HTTP/WebSocket surface
//! - Transcript inspection via `warroom replay`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warroom_core::{SessionConfig, TranscriptLog};

#[derive(Parser)]
#[command(name = "warroom", version, about = "War Room turn-taking message bus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP/WebSocket server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,

        /// YAML file with session defaults (introduction order, expiry, ...)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds between question-expiry sweeps for idle sessions
        #[arg(long, default_value_t = 5)]
        sweep_interval: u64,
    },

    /// Print a persisted session transcript
    Replay {
        /// Path to a transcript .jsonl file
        transcript: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warroom=info,warroom_web=info,warroom_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            config,
            sweep_interval,
        } => {
            let session_defaults = match config {
                Some(path) => SessionConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => SessionConfig::default(),
            };

            let config = warroom_web::Config {
                port,
                session_defaults,
                sweep_interval_secs: sweep_interval,
            };

            tracing::info!("War Room listening on http://localhost:{}", config.port);
            warroom_web::serve(config).await?;
        }

        Command::Replay { transcript } => {
            let log = TranscriptLog::new(&transcript);
            let messages = log
                .replay()
                .with_context(|| format!("reading transcript {}", transcript.display()))?;

            if messages.is_empty() {
                println!("(empty transcript)");
                return Ok(());
            }

            for message in messages {
                let time = message.timestamp.format("%H:%M:%S");
                println!(
                    "[{:>4}] {} {} -> {} ({}): {}",
                    message.id, time, message.from, message.to, message.kind, message.content
                );
                if let Some(question) = &message.question {
                    if let Some(options) = &question.options {
                        println!("       options: {}", options.join(" | "));
                    }
                }
            }
        }
    }

    Ok(())
}
