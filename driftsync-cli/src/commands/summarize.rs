//! `driftsync summarize <OLD> <NEW>` — print the change record a session
//! would emit for an edit from OLD to NEW.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use driftsync_sync::SyncSession;

/// Arguments for `driftsync summarize`.
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Previously observed version of the file.
    pub old: PathBuf,

    /// Newly observed version of the file.
    pub new: PathBuf,

    /// Path recorded in the change record (defaults to NEW).
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Language identifier attached to the record.
    #[arg(long)]
    pub language: Option<String>,

    /// Changed-ratio above which a resync is requested instead of a delta.
    #[arg(long)]
    pub threshold: Option<f64>,
}

impl SummarizeArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let old = super::read_input(&self.old)?;
        let new = super::read_input(&self.new)?;

        let threshold = self.threshold.unwrap_or(config.change_ratio_threshold);
        if !threshold.is_finite() || threshold < 0.0 {
            anyhow::bail!("--threshold must be a non-negative number, got {threshold}");
        }

        let path = self.path.unwrap_or(self.new);
        let session = SyncSession::with_threshold(threshold);
        session.summarize(&path, self.language.as_deref(), &old);
        let record = session.summarize(&path, None, &new);

        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("failed to serialize change record")?
        );
        Ok(())
    }
}
