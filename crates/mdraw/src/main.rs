//! mdraw CLI - raw-content protection for Markdown pipelines.
//!
//! Provides commands for:
//! - `escape`: Move protected spans into the content store
//! - `unescape`: Restore protected spans from the content store

mod commands;
mod error;
mod output;
mod walker;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{EscapeArgs, UnescapeArgs};
use output::Output;

/// mdraw - protect raw Markdown content across build pipelines.
#[derive(Parser)]
#[command(name = "mdraw", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Escape protected spans into the content store.
    Escape(EscapeArgs),
    /// Restore escaped spans from the content store.
    Unescape(UnescapeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Escape(args) => args.verbose,
        Commands::Unescape(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Escape(args) => args.execute(&output),
        Commands::Unescape(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
