//! Domain types shared by the summarizer, the diff parser/applier and the
//! workspace orchestrator.
//!
//! All path fields use `PathBuf`. Text offsets inside [`ChangeRecord`] are
//! counted in `char`s (Unicode scalar values), never bytes.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tracked file state
// ---------------------------------------------------------------------------

/// Last-observed state of a single file inside a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_id: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl TrackedFile {
    pub fn new(content: impl Into<String>, language_id: Option<String>) -> Self {
        Self {
            content: content.into(),
            language_id,
            observed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Why a [`ChangeRecord::Unchanged`] was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// Content is identical to the tracked state.
    NoChange,
    /// Content changed too much for a delta; the caller must send the full
    /// content out of band.
    ResyncRequired,
}

/// Compact description of a local edit, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeRecord {
    Snapshot {
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        language_id: Option<String>,
        content: String,
    },
    Delta {
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        language_id: Option<String>,
        start: usize,
        delete_count: usize,
        insert_text: String,
    },
    Unchanged {
        path: PathBuf,
        reason: UnchangedReason,
    },
}

impl ChangeRecord {
    pub fn path(&self) -> &Path {
        match self {
            ChangeRecord::Snapshot { path, .. }
            | ChangeRecord::Delta { path, .. }
            | ChangeRecord::Unchanged { path, .. } => path,
        }
    }

    /// True when the receiver must fetch full content out of band.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            ChangeRecord::Unchanged {
                reason: UnchangedReason::ResyncRequired,
                ..
            }
        )
    }

    /// Reconstruct the new content from `previous`.
    ///
    /// Returns `None` for [`UnchangedReason::ResyncRequired`] (the record does
    /// not carry enough information) and for deltas whose range falls outside
    /// `previous`.
    pub fn apply_to(&self, previous: &str) -> Option<String> {
        match self {
            ChangeRecord::Snapshot { content, .. } => Some(content.clone()),
            ChangeRecord::Delta {
                start,
                delete_count,
                insert_text,
                ..
            } => splice_chars(previous, *start, *delete_count, insert_text),
            ChangeRecord::Unchanged { reason, .. } => match reason {
                UnchangedReason::NoChange => Some(previous.to_owned()),
                UnchangedReason::ResyncRequired => None,
            },
        }
    }
}

/// Byte offset of the `n`-th char of `text`, or `text.len()` when `n` equals
/// the char count.
fn char_to_byte(text: &str, n: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(n)
}

fn splice_chars(text: &str, start: usize, delete_count: usize, insert: &str) -> Option<String> {
    let begin = char_to_byte(text, start)?;
    let end = begin + char_to_byte(&text[begin..], delete_count)?;
    let mut out = String::with_capacity(text.len() - (end - begin) + insert.len());
    out.push_str(&text[..begin]);
    out.push_str(insert);
    out.push_str(&text[end..]);
    Some(out)
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// A single line of a hunk body, without its prefix or line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum PatchLine {
    /// Unchanged line; must match the original.
    Context(String),
    /// New line with no original counterpart.
    Add(String),
    /// Original line that must match and is dropped.
    Remove(String),
}

impl PatchLine {
    pub fn text(&self) -> &str {
        match self {
            PatchLine::Context(t) | PatchLine::Add(t) | PatchLine::Remove(t) => t,
        }
    }

    /// Prefix character used in unified diff text.
    pub fn prefix(&self) -> char {
        match self {
            PatchLine::Context(_) => ' ',
            PatchLine::Add(_) => '+',
            PatchLine::Remove(_) => '-',
        }
    }
}

impl fmt::Display for PatchLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.text())
    }
}

/// A contiguous changed region, anchored to line ranges in both versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// 1-based first line in the original (0 for insertions into an empty file).
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    /// Trailing text after the closing `@@`, usually a function signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub lines: Vec<PatchLine>,
    /// The last original line in this hunk has no trailing newline.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub old_missing_newline: bool,
    /// The last new line in this hunk has no trailing newline.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub new_missing_newline: bool,
}

impl Hunk {
    /// Number of original lines the body consumes (context + remove).
    pub fn consumed(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| !matches!(l, PatchLine::Add(_)))
            .count()
    }

    /// Number of lines the body produces (context + add).
    pub fn produced(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| !matches!(l, PatchLine::Remove(_)))
            .count()
    }

    /// Whether the body agrees with the counts declared in the header.
    pub fn is_consistent(&self) -> bool {
        self.consumed() == self.old_lines && self.produced() == self.new_lines
    }
}

/// All hunks targeting a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// File the patch acts on: the new path, or the old path for deletions.
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<PathBuf>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// The file is modified in place under a different name.
    pub fn renamed_from(&self) -> Option<&Path> {
        if self.is_new || self.is_deleted {
            return None;
        }
        match (&self.old_path, &self.new_path) {
            (Some(old), Some(new)) if old != new => Some(old),
            _ => None,
        }
    }

    pub fn added_lines(&self) -> usize {
        self.lines_matching(|l| matches!(l, PatchLine::Add(_)))
    }

    pub fn removed_lines(&self) -> usize {
        self.lines_matching(|l| matches!(l, PatchLine::Remove(_)))
    }

    fn lines_matching(&self, pred: impl Fn(&PatchLine) -> bool) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .filter(|l| pred(l))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Apply results
// ---------------------------------------------------------------------------

/// A mismatch between what a patch expects and what the file contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// 1-based line number in the original file.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Outcome of applying one [`Patch`] to one file's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchResult {
    Applied {
        path: PathBuf,
        content: String,
    },
    Rejected {
        path: PathBuf,
        error: String,
        conflicts: Vec<Conflict>,
    },
}

impl PatchResult {
    pub fn success(&self) -> bool {
        matches!(self, PatchResult::Applied { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            PatchResult::Applied { path, .. } | PatchResult::Rejected { path, .. } => path,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            PatchResult::Applied { content, .. } => Some(content),
            PatchResult::Rejected { .. } => None,
        }
    }

    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            PatchResult::Applied { .. } => &[],
            PatchResult::Rejected { conflicts, .. } => conflicts,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
