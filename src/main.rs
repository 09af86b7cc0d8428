mod commands;
mod render;
mod singleton;
mod utils;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eventsync")]
#[command(about = "Reconcile scraped event listings against the previous run and sync them to a calendar")]
struct Cli {
    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile, replace the calendar contents and save the snapshot
    Run {
        /// List every event instead of counts
        #[arg(short, long)]
        verbose: bool,
    },
    /// Reconcile and show the result without touching calendar or snapshot
    Status {
        #[arg(short, long)]
        verbose: bool,
    },
    /// Delete every event in the configured calendar
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { verbose } => commands::run::run(cli.date, verbose).await,
        Commands::Status { verbose } => commands::status::run(cli.date, verbose),
        Commands::Purge => commands::purge::run().await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
