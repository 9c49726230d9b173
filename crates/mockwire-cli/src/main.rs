use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod fixture;

#[derive(Parser)]
#[command(
    name = "mockwire",
    about = "mockwire: play canned HTTP responses without a network",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a response fixture and print every callback the client sees.
    Play {
        /// Path to the fixture TOML file
        fixture: PathBuf,
        /// Raw id of the exchange handle
        #[arg(long, default_value = "1")]
        handle: u64,
        /// Cancel from the client after this many data chunks
        #[arg(long)]
        cancel_after: Option<usize>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show the chunk plan for a fixture without playing it.
    Plan {
        /// Path to the fixture TOML file
        fixture: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries events.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,mockwire=debug,mockwire_delivery=debug"))?,
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            fixture,
            handle,
            cancel_after,
            format,
        } => commands::play::play(&fixture, handle, cancel_after, &format).await,
        Commands::Plan { fixture, format } => commands::plan::plan(&fixture, &format),
    }
}
