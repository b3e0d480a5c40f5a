//! Multi-file patch application through a [`FileAccessor`].
//!
//! Every patch is handled on its own: a conflict or I/O failure in one file is
//! recorded in that file's [`FileOutcome`] and the batch carries on. A failed
//! file is never written, so it keeps its previous content.

use std::path::{Path, PathBuf};

use serde::Serialize;

use driftsync_core::{
    types::{Conflict, Patch, PatchResult},
    WhitespaceMode,
};
use driftsync_diff::{apply_with, new_file_content};

use crate::accessor::FileAccessor;
use crate::error::AccessError;
use crate::session::SyncSession;

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Read and check everything, but never `create`, `write` or `delete`.
    pub dry_run: bool,
    pub whitespace: WhitespaceMode,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyStatus {
    Created,
    Modified,
    /// The patch applied but produced the current content; nothing written.
    Unchanged,
    Deleted,
    Renamed {
        from: PathBuf,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        conflicts: Vec<Conflict>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: ApplyStatus,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl FileOutcome {
    pub fn success(&self) -> bool {
        !matches!(self.status, ApplyStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ApplyStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Per-file outcomes of one [`apply_all`] run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<FileOutcome>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }
}

// ---------------------------------------------------------------------------
// apply_all
// ---------------------------------------------------------------------------

/// Apply every patch in order. Never fails as a whole; see [`ApplyReport`].
pub fn apply_all<A>(patches: &[Patch], accessor: &mut A, options: ApplyOptions) -> ApplyReport
where
    A: FileAccessor + ?Sized,
{
    run(patches, accessor, options, None)
}

/// Like [`apply_all`], then record each written file in `session` so the
/// engine's own writes are not reported back as local edits.
pub fn apply_all_observed<A>(
    patches: &[Patch],
    accessor: &mut A,
    options: ApplyOptions,
    session: &SyncSession,
) -> ApplyReport
where
    A: FileAccessor + ?Sized,
{
    run(patches, accessor, options, Some(session))
}

fn run<A>(
    patches: &[Patch],
    accessor: &mut A,
    options: ApplyOptions,
    session: Option<&SyncSession>,
) -> ApplyReport
where
    A: FileAccessor + ?Sized,
{
    let mut report = ApplyReport::default();

    for patch in patches {
        let status = match apply_one(patch, accessor, options) {
            Ok(change) => {
                tracing::info!(
                    "{}{}: {}",
                    if options.dry_run { "[dry-run] " } else { "" },
                    change.label(),
                    patch.path.display()
                );
                if let (Some(session), false) = (session, options.dry_run) {
                    change.record(&patch.path, session);
                }
                change.into_status()
            }
            Err(failure) => {
                let status = failure.into_status();
                if let ApplyStatus::Failed { error, .. } = &status {
                    tracing::warn!("failed: {}: {error}", patch.path.display());
                }
                status
            }
        };

        report.outcomes.push(FileOutcome {
            path: patch.path.clone(),
            status,
            dry_run: options.dry_run,
        });
    }

    report
}

// ---------------------------------------------------------------------------
// Single patch
// ---------------------------------------------------------------------------

enum Change {
    Created(String),
    Modified(String),
    Unchanged,
    Deleted,
    Renamed { from: PathBuf, content: String },
}

impl Change {
    fn label(&self) -> &'static str {
        match self {
            Change::Created(_) => "created",
            Change::Modified(_) => "modified",
            Change::Unchanged => "unchanged",
            Change::Deleted => "deleted",
            Change::Renamed { .. } => "renamed",
        }
    }

    fn record(&self, path: &Path, session: &SyncSession) {
        match self {
            Change::Created(content) | Change::Modified(content) => {
                session.observe(path, None, content);
            }
            Change::Unchanged => {}
            Change::Deleted => {
                session.forget(path);
            }
            Change::Renamed { from, content } => {
                session.forget(from);
                session.observe(path, None, content);
            }
        }
    }

    fn into_status(self) -> ApplyStatus {
        match self {
            Change::Created(_) => ApplyStatus::Created,
            Change::Modified(_) => ApplyStatus::Modified,
            Change::Unchanged => ApplyStatus::Unchanged,
            Change::Deleted => ApplyStatus::Deleted,
            Change::Renamed { from, .. } => ApplyStatus::Renamed { from },
        }
    }
}

enum Failure {
    Access(AccessError),
    Conflict {
        error: String,
        conflicts: Vec<Conflict>,
    },
}

impl From<AccessError> for Failure {
    fn from(e: AccessError) -> Self {
        Failure::Access(e)
    }
}

impl Failure {
    fn into_status(self) -> ApplyStatus {
        match self {
            Failure::Access(e) => ApplyStatus::Failed {
                error: e.to_string(),
                conflicts: Vec::new(),
            },
            Failure::Conflict { error, conflicts } => ApplyStatus::Failed { error, conflicts },
        }
    }
}

fn apply_one<A>(patch: &Patch, accessor: &mut A, options: ApplyOptions) -> Result<Change, Failure>
where
    A: FileAccessor + ?Sized,
{
    if patch.is_deleted {
        if options.dry_run {
            ensure_present(accessor, &patch.path)?;
        } else {
            accessor.delete(&patch.path)?;
        }
        return Ok(Change::Deleted);
    }

    if patch.is_new {
        let content = new_file_content(patch);
        if options.dry_run {
            ensure_absent(accessor, &patch.path)?;
        } else {
            create_with(accessor, &patch.path, &content)?;
        }
        return Ok(Change::Created(content));
    }

    if let Some(from) = patch.renamed_from() {
        let original = accessor.read(from)?;
        let content = replay(&original, patch, options.whitespace)?;
        if options.dry_run {
            ensure_absent(accessor, &patch.path)?;
        } else {
            create_with(accessor, &patch.path, &content)?;
            if let Err(e) = accessor.delete(from) {
                let _ = accessor.delete(&patch.path);
                return Err(e.into());
            }
        }
        return Ok(Change::Renamed {
            from: from.to_path_buf(),
            content,
        });
    }

    let original = accessor.read(&patch.path)?;
    let content = replay(&original, patch, options.whitespace)?;
    if content == original {
        return Ok(Change::Unchanged);
    }
    if !options.dry_run {
        accessor.write(&patch.path, &content)?;
    }
    Ok(Change::Modified(content))
}

fn replay(original: &str, patch: &Patch, mode: WhitespaceMode) -> Result<String, Failure> {
    match apply_with(original, patch, mode) {
        PatchResult::Applied { content, .. } => Ok(content),
        PatchResult::Rejected {
            error, conflicts, ..
        } => Err(Failure::Conflict { error, conflicts }),
    }
}

/// `create` + `write`; the empty file is removed again if the write fails.
fn create_with<A>(accessor: &mut A, path: &Path, content: &str) -> Result<(), AccessError>
where
    A: FileAccessor + ?Sized,
{
    accessor.create(path)?;
    if let Err(e) = accessor.write(path, content) {
        let _ = accessor.delete(path);
        return Err(e);
    }
    Ok(())
}

/// Dry-run stand-in for `delete`: the target must exist.
fn ensure_present<A>(accessor: &A, path: &Path) -> Result<(), AccessError>
where
    A: FileAccessor + ?Sized,
{
    accessor.read(path).map(|_| ())
}

/// Dry-run stand-in for `create`: the target must not exist yet.
fn ensure_absent<A>(accessor: &A, path: &Path) -> Result<(), AccessError>
where
    A: FileAccessor + ?Sized,
{
    match accessor.read(path) {
        Ok(_) => Err(AccessError::AlreadyExists {
            path: path.to_path_buf(),
        }),
        Err(AccessError::NotFound { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::MemoryAccessor;
    use driftsync_diff::parse;

    const MODIFY: &str = "\
--- a/a.txt
+++ b/a.txt
@@ -1,2 +1,2 @@
 keep
-old
+new
";

    #[test]
    fn modify_writes_new_content() {
        let mut mem = MemoryAccessor::new().with_file("a.txt", "keep\nold\n");
        let report = apply_all(&parse(MODIFY), &mut mem, ApplyOptions::default());
        assert_eq!(report.outcomes[0].status, ApplyStatus::Modified);
        assert_eq!(mem.get("a.txt"), Some("keep\nnew\n"));
    }

    #[test]
    fn conflict_reports_failure_without_writing() {
        let mut mem = MemoryAccessor::new().with_file("a.txt", "keep\nchanged\n");
        let report = apply_all(&parse(MODIFY), &mut mem, ApplyOptions::default());
        assert_eq!(report.failed(), 1);
        let outcome = &report.outcomes[0];
        assert!(outcome.error().unwrap_or_default().contains("line 2"));
        match &outcome.status {
            ApplyStatus::Failed { conflicts, .. } => assert_eq!(conflicts[0].line, 2),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(mem.mutations().is_empty());
    }

    #[test]
    fn identical_result_is_unchanged_without_write() {
        let text = "--- a/a.txt\n+++ b/a.txt\n@@ -1,1 +1,1 @@\n a\n";
        let mut mem = MemoryAccessor::new().with_file("a.txt", "a\n");
        let report = apply_all(&parse(text), &mut mem, ApplyOptions::default());
        assert_eq!(report.outcomes[0].status, ApplyStatus::Unchanged);
        assert!(mem.mutations().is_empty());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let mut mem = MemoryAccessor::new().with_file("a.txt", "keep\nold\n");
        let options = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };
        let report = apply_all(&parse(MODIFY), &mut mem, options);
        assert!(report.outcomes[0].dry_run);
        assert_eq!(report.outcomes[0].status, ApplyStatus::Modified);
        assert_eq!(mem.get("a.txt"), Some("keep\nold\n"));
        assert!(mem.mutations().is_empty());
    }

    #[test]
    fn dry_run_deletion_requires_the_file() {
        let text = "--- a/gone.txt\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-x\n";
        let options = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };

        let mut missing = MemoryAccessor::new();
        let report = apply_all(&parse(text), &mut missing, options);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[0]
            .error()
            .unwrap_or_default()
            .contains("not found"));

        let mut present = MemoryAccessor::new().with_file("gone.txt", "x\n");
        let report = apply_all(&parse(text), &mut present, options);
        assert_eq!(report.outcomes[0].status, ApplyStatus::Deleted);
        assert_eq!(present.get("gone.txt"), Some("x\n"));
        assert!(present.mutations().is_empty());
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = FileOutcome {
            path: "a.txt".into(),
            status: ApplyStatus::Renamed {
                from: "b.txt".into(),
            },
            dry_run: false,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "path": "a.txt", "status": "renamed", "from": "b.txt" })
        );
    }
}
