//! driftsync — apply agent-produced diffs and summarize local edits.
//!
//! # Usage
//!
//! ```text
//! driftsync apply <DIFF|-> [--root DIR] [--dry-run] [--strict] [--json]
//! driftsync parse <DIFF|-> [--json]
//! driftsync diff <OLD> <NEW> [--path NAME] [--context N]
//! driftsync summarize <OLD> <NEW> [--path NAME] [--language ID] [--threshold R]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, diff::DiffArgs, parse::ParseArgs, summarize::SummarizeArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "driftsync",
    version,
    about = "Apply unified diffs to a workspace and summarize file edits",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a multi-file unified diff to a directory tree.
    Apply(ApplyArgs),

    /// Parse a unified diff and show the patches it contains.
    Parse(ParseArgs),

    /// Print a unified diff between two files.
    Diff(DiffArgs),

    /// Describe the change between two versions of a file as a change record.
    Summarize(SummarizeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Apply(args) => args.run(),
        Commands::Parse(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Summarize(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries diffs and JSON; logs go to stderr.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
