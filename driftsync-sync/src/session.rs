//! Per-session tracked file state.
//!
//! A [`SyncSession`] owns the last-observed content of every file touched in
//! one synchronization session. Sessions are plain values, so several open
//! projects each get their own. Every operation holds the session lock for
//! its whole read-compare-write, which serializes concurrent edit sources.
//!
//! Identity is the path string: a rename shows up as [`SyncSession::forget`]
//! on the old path plus a cold-start snapshot on the new one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use driftsync_core::{
    types::{ChangeRecord, TrackedFile, UnchangedReason},
    Config, DEFAULT_CHANGE_RATIO_THRESHOLD,
};

use crate::summarizer;

#[derive(Debug)]
pub struct SyncSession {
    change_ratio_threshold: f64,
    files: Mutex<HashMap<PathBuf, TrackedFile>>,
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncSession {
    /// Empty session with the default change-ratio threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_CHANGE_RATIO_THRESHOLD)
    }

    /// Session with a custom change-ratio threshold.
    ///
    /// A NaN, infinite or negative value would make every edit a delta or
    /// every edit a resync, so it falls back to the default.
    pub fn with_threshold(change_ratio_threshold: f64) -> Self {
        let change_ratio_threshold =
            if change_ratio_threshold.is_finite() && change_ratio_threshold >= 0.0 {
                change_ratio_threshold
            } else {
                tracing::warn!(
                    "ignoring invalid change-ratio threshold {change_ratio_threshold}, \
                     using {DEFAULT_CHANGE_RATIO_THRESHOLD}"
                );
                DEFAULT_CHANGE_RATIO_THRESHOLD
            };
        Self {
            change_ratio_threshold,
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_threshold(config.change_ratio_threshold)
    }

    pub fn change_ratio_threshold(&self) -> f64 {
        self.change_ratio_threshold
    }

    /// Describe `new_content` relative to what was last seen at `path`.
    ///
    /// Tracked state becomes `new_content` unless the result is
    /// [`UnchangedReason::NoChange`]. A `None` language keeps the tracked one.
    pub fn summarize(
        &self,
        path: impl AsRef<Path>,
        language_id: Option<&str>,
        new_content: &str,
    ) -> ChangeRecord {
        let path = path.as_ref();
        let mut files = self.lock();
        let previous = files.get(path);
        let language_id = language_id
            .map(str::to_owned)
            .or_else(|| previous.and_then(|p| p.language_id.clone()));

        let record = summarizer::summarize(
            path,
            previous,
            language_id.clone(),
            new_content,
            self.change_ratio_threshold,
        );

        let unchanged = matches!(
            record,
            ChangeRecord::Unchanged {
                reason: UnchangedReason::NoChange,
                ..
            }
        );
        if !unchanged {
            files.insert(path.to_path_buf(), TrackedFile::new(new_content, language_id));
        }
        record
    }

    /// Seed or overwrite tracked state without emitting a record.
    pub fn observe(&self, path: impl AsRef<Path>, language_id: Option<&str>, content: &str) {
        let path = path.as_ref();
        let mut files = self.lock();
        let language_id = language_id
            .map(str::to_owned)
            .or_else(|| files.get(path).and_then(|p| p.language_id.clone()));
        files.insert(path.to_path_buf(), TrackedFile::new(content, language_id));
    }

    /// Drop tracked state for `path`; the next touch re-snapshots it.
    pub fn forget(&self, path: impl AsRef<Path>) -> bool {
        self.lock().remove(path.as_ref()).is_some()
    }

    /// Copy of the tracked state for `path`.
    pub fn tracked(&self, path: impl AsRef<Path>) -> Option<TrackedFile> {
        self.lock().get(path.as_ref()).cloned()
    }

    /// Tracked paths, sorted.
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Clear every tracked file in one step.
    pub fn reset(&self) {
        let mut files = self.lock();
        let dropped = files.len();
        files.clear();
        tracing::info!("sync session reset ({dropped} tracked files dropped)");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, TrackedFile>> {
        // A panic mid-operation never leaves a half-written entry behind
        // (inserts are single calls), so the map is still usable.
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
