//! Cineview CLI - Headless Playback Demo
//!
//! Features:
//! - Simulated playback with live progress and buffer display
//! - Raw event stream inspection (JSON lines)

use clap::{Parser, Subcommand};

mod commands;

/// Cineview CLI - playback session demo
#[derive(Parser)]
#[command(name = "cineview-cli")]
#[command(version)]
#[command(about = "Drive a playback session against the simulated engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a media URL with a live progress display
    Play {
        /// Media URL (handed opaquely to the engine)
        #[arg(default_value = "https://example.com/sample.mp4")]
        url: String,

        /// Title shown in the header
        #[arg(short, long, default_value = "Sample Clip")]
        title: String,

        /// Simulated media duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: f64,

        /// Playback rate
        #[arg(short, long, default_value = "1.0")]
        rate: f64,

        /// Start paused instead of auto-playing
        #[arg(long)]
        paused: bool,

        /// Seek to zero and replay at the end (stop with Ctrl-C)
        #[arg(long)]
        repeat: bool,
    },

    /// Play and dump the raw event stream as JSON lines
    Events {
        /// Media URL
        #[arg(default_value = "https://example.com/sample.mp4")]
        url: String,

        /// Simulated media duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    match cli.command {
        Commands::Play { url, title, duration, rate, paused, repeat } => {
            commands::play(&url, &title, duration, rate, paused, repeat).await?;
        }
        Commands::Events { url, duration } => {
            commands::events(&url, duration).await?;
        }
    }

    Ok(())
}
