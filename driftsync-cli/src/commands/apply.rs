//! `driftsync apply` — apply a multi-file diff to a directory tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use driftsync_core::WhitespaceMode;
use driftsync_diff::parse;
use driftsync_sync::{apply_all, ApplyOptions, ApplyReport, ApplyStatus, FsAccessor};

/// Arguments for `driftsync apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Diff file to apply, or `-` to read it from stdin.
    pub diff: PathBuf,

    /// Directory the diff's paths are relative to.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Check every file without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Compare context lines exactly instead of ignoring surrounding whitespace.
    #[arg(long)]
    pub strict: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let text = super::read_input(&self.diff)?;
        let patches = parse(&text);

        let options = ApplyOptions {
            dry_run: self.dry_run,
            whitespace: if self.strict {
                WhitespaceMode::Strict
            } else {
                config.whitespace
            },
        };
        let mut accessor = FsAccessor::new(&self.root);
        let report = apply_all(&patches, &mut accessor, options);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize apply report")?
            );
        } else {
            print_report(&report, self.dry_run);
        }

        if !report.is_clean() {
            bail!(
                "{} of {} files failed to apply",
                report.failed(),
                report.outcomes.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &ApplyReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.outcomes.is_empty() {
        println!("{prefix}No file changes found in diff.");
        return;
    }

    let summary = format!(
        "{prefix}{} applied, {} failed",
        report.succeeded(),
        report.failed()
    );
    if report.is_clean() {
        println!("{} {summary}", "✓".green());
    } else {
        println!("{} {summary}", "✗".red());
    }

    let rows: Vec<OutcomeRow> = report
        .outcomes
        .iter()
        .map(|o| {
            let (status, detail) = describe(&o.status);
            OutcomeRow {
                file: o.path.display().to_string(),
                status: status.to_string(),
                detail,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn describe(status: &ApplyStatus) -> (&'static str, String) {
    match status {
        ApplyStatus::Created => ("created", String::new()),
        ApplyStatus::Modified => ("modified", String::new()),
        ApplyStatus::Unchanged => ("unchanged", "already up to date".to_string()),
        ApplyStatus::Deleted => ("deleted", String::new()),
        ApplyStatus::Renamed { from } => ("renamed", format!("from {}", from.display())),
        ApplyStatus::Failed { error, .. } => ("failed", error.clone()),
    }
}
