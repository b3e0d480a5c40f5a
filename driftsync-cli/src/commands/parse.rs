//! `driftsync parse` — show the patches a diff contains.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use driftsync_diff::{parse, Patch};

/// Arguments for `driftsync parse`.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Diff file to parse, or `-` to read it from stdin.
    pub diff: PathBuf,

    /// Emit the parsed patches as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ParseArgs {
    pub fn run(self) -> Result<()> {
        let text = super::read_input(&self.diff)?;
        let patches = parse(&text);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&patches).context("failed to serialize patches")?
            );
            return Ok(());
        }

        if patches.is_empty() {
            println!("No file changes found in diff.");
            return Ok(());
        }
        for patch in &patches {
            print_patch(patch);
        }
        Ok(())
    }
}

fn print_patch(patch: &Patch) {
    let kind = if patch.is_new {
        "new".green().to_string()
    } else if patch.is_deleted {
        "deleted".red().to_string()
    } else if let Some(from) = patch.renamed_from() {
        format!("renamed from {}", from.display()).yellow().to_string()
    } else {
        "modified".to_string()
    };
    println!(
        "{} ({kind}) +{} -{}",
        patch.path.display().to_string().bold(),
        patch.added_lines(),
        patch.removed_lines()
    );
    for hunk in &patch.hunks {
        let header = hunk.header.as_deref().unwrap_or_default();
        println!(
            "  @@ -{},{} +{},{} @@ {header}",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        );
    }
}
