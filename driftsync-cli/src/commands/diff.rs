//! `driftsync diff <OLD> <NEW>` — produce a unified diff between two files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use driftsync_diff::parser::DEV_NULL;
use driftsync_diff::unified_diff;

/// Arguments for `driftsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old version of the file (`/dev/null` for a creation).
    pub old: PathBuf,

    /// New version of the file (`/dev/null` for a deletion).
    pub new: PathBuf,

    /// Path to name in the diff headers (defaults to NEW, or OLD for deletions).
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Lines of context around each change (defaults to the configured radius).
    #[arg(long)]
    pub context: Option<usize>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let old = read_side(&self.old)?;
        let new = read_side(&self.new)?;

        let path = self.path.clone().unwrap_or_else(|| {
            if new.is_some() {
                self.new.clone()
            } else {
                self.old.clone()
            }
        });
        let radius = self.context.unwrap_or(config.context_radius);

        let text = unified_diff(&path, old.as_deref(), new.as_deref(), radius);
        if text.is_empty() {
            println!("No differences.");
            return Ok(());
        }
        print!("{text}");
        Ok(())
    }
}

fn read_side(path: &Path) -> Result<Option<String>> {
    if path == Path::new(DEV_NULL) {
        return Ok(None);
    }
    super::read_input(path).map(Some)
}
