//! Tolerant parser for multi-file unified diff text.
//!
//! Recognised per line, in order:
//!
//! 1. `diff --git a/X b/Y` — file boundary; closes the current hunk and patch.
//! 2. Hunk body (`+`, `-`, ` `, blank, `\ No newline…`) while a hunk is open.
//! 3. `--- ` / `+++ ` — old / new path markers.
//! 4. `@@ -a[,b] +c[,d] @@ [text]` — hunk header.
//! 5. Git extended headers (`new file mode`, `deleted file mode`,
//!    `rename from`, `rename to`).
//!
//! Anything else is skipped. Inside a hunk that still expects body lines the
//! hunk stays open; after a complete hunk the line ends it. Parsing never
//! fails; a text with no file sections yields an empty list.

use std::path::PathBuf;

use driftsync_core::types::{Hunk, Patch, PatchLine};

pub const FILE_BOUNDARY_PREFIX: &str = "diff --git ";
pub const OLD_FILE_PREFIX: &str = "--- ";
pub const NEW_FILE_PREFIX: &str = "+++ ";
pub const HUNK_HEADER_PREFIX: &str = "@@";
pub const DEV_NULL: &str = "/dev/null";

/// Parse `diff_text` into one [`Patch`] per file section, in input order.
pub fn parse(diff_text: &str) -> Vec<Patch> {
    let lines: Vec<&str> = diff_text
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut parser = Parser::default();
    for (i, line) in lines.iter().enumerate() {
        parser.feed(line, lines.get(i + 1).copied());
    }
    parser.finish()
}

// ---------------------------------------------------------------------------
// Parser state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Parser {
    patches: Vec<Patch>,
    patch: Option<PatchBuilder>,
    hunk: Option<HunkBuilder>,
}

impl Parser {
    fn feed(&mut self, line: &str, next: Option<&str>) {
        if let Some(rest) = line.strip_prefix(FILE_BOUNDARY_PREFIX) {
            self.close_patch();
            self.patch = Some(PatchBuilder::from_git_header(rest));
            return;
        }

        if let Some(hunk) = self.hunk.as_mut() {
            if hunk.accepts(line, next) {
                hunk.push(line);
                return;
            }
        }

        if let Some(rest) = line.strip_prefix(OLD_FILE_PREFIX) {
            self.close_hunk();
            let starts_section = self
                .patch
                .as_ref()
                .map_or(true, PatchBuilder::has_content);
            if starts_section {
                self.close_patch();
                self.patch = Some(PatchBuilder::default());
            }
            if let Some(patch) = self.patch.as_mut() {
                patch.set_old_marker(rest);
            }
            return;
        }

        if let Some(rest) = line.strip_prefix(NEW_FILE_PREFIX) {
            self.close_hunk();
            self.patch
                .get_or_insert_with(PatchBuilder::default)
                .set_new_marker(rest);
            return;
        }

        if line.starts_with(HUNK_HEADER_PREFIX) {
            match parse_hunk_header(line) {
                Some(hunk) => {
                    self.close_hunk();
                    self.patch.get_or_insert_with(PatchBuilder::default);
                    self.hunk = Some(HunkBuilder::new(hunk));
                }
                None => tracing::warn!("skipping malformed hunk header: {line}"),
            }
            return;
        }

        if let Some(hunk) = self.hunk.as_ref() {
            if hunk.expects_more() {
                tracing::debug!("skipping unrecognized line inside hunk: {line}");
            } else {
                // Prose or a code fence after the body ends the hunk.
                self.close_hunk();
            }
        } else if let Some(patch) = self.patch.as_mut() {
            patch.extended_header(line);
        }
    }

    fn close_hunk(&mut self) {
        if let Some(builder) = self.hunk.take() {
            let hunk = builder.finish();
            if !hunk.is_consistent() {
                tracing::warn!(
                    "hunk @@ -{},{} +{},{} @@ body has {} old / {} new lines",
                    hunk.old_start,
                    hunk.old_lines,
                    hunk.new_start,
                    hunk.new_lines,
                    hunk.consumed(),
                    hunk.produced()
                );
            }
            if let Some(patch) = self.patch.as_mut() {
                patch.hunks.push(hunk);
            }
        }
    }

    fn close_patch(&mut self) {
        self.close_hunk();
        if let Some(builder) = self.patch.take() {
            if let Some(patch) = builder.finish() {
                self.patches.push(patch);
            }
        }
    }

    fn finish(mut self) -> Vec<Patch> {
        self.close_patch();
        self.patches
    }
}

// ---------------------------------------------------------------------------
// Patch builder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PatchBuilder {
    old_path: Option<PathBuf>,
    new_path: Option<PathBuf>,
    is_new: bool,
    is_deleted: bool,
    has_old_marker: bool,
    has_new_marker: bool,
    hunks: Vec<Hunk>,
}

impl PatchBuilder {
    fn from_git_header(rest: &str) -> Self {
        let mut builder = Self::default();
        if let Some((old, new)) = split_git_header(rest) {
            builder.old_path = Some(PathBuf::from(old));
            builder.new_path = Some(PathBuf::from(new));
        }
        builder
    }

    /// A `--- ` line seen now belongs to the next file section.
    fn has_content(&self) -> bool {
        self.has_old_marker || self.has_new_marker || !self.hunks.is_empty()
    }

    fn set_old_marker(&mut self, raw: &str) {
        self.has_old_marker = true;
        match marker_path(raw, "a/") {
            Some(path) => self.old_path = Some(path),
            None => {
                self.is_new = true;
                self.old_path = None;
            }
        }
    }

    fn set_new_marker(&mut self, raw: &str) {
        self.has_new_marker = true;
        match marker_path(raw, "b/") {
            Some(path) => self.new_path = Some(path),
            None => {
                self.is_deleted = true;
                self.new_path = None;
            }
        }
    }

    fn extended_header(&mut self, line: &str) {
        if line.starts_with("new file mode") {
            self.is_new = true;
        } else if line.starts_with("deleted file mode") {
            self.is_deleted = true;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            self.old_path = Some(PathBuf::from(from.trim()));
        } else if let Some(to) = line.strip_prefix("rename to ") {
            self.new_path = Some(PathBuf::from(to.trim()));
        }
    }

    fn finish(self) -> Option<Patch> {
        let old_path = if self.is_new { None } else { self.old_path };
        let new_path = if self.is_deleted { None } else { self.new_path };
        let path = if self.is_deleted {
            old_path.clone()
        } else {
            new_path.clone().or_else(|| old_path.clone())
        };
        let Some(path) = path else {
            tracing::warn!(
                "dropping diff section without a file path ({} hunks)",
                self.hunks.len()
            );
            return None;
        };
        Some(Patch {
            path,
            old_path,
            new_path,
            is_new: self.is_new,
            is_deleted: self.is_deleted,
            hunks: self.hunks,
        })
    }
}

/// Split the remainder of `diff --git a/X b/Y` into `(X, Y)`.
fn split_git_header(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim();
    let idx = rest.rfind(" b/")?;
    let old = rest[..idx].trim();
    let new = &rest[idx + 3..];
    let old = old.strip_prefix("a/").unwrap_or(old);
    Some((old.to_owned(), new.trim().to_owned()))
}

/// Path from a `--- ` / `+++ ` marker, or `None` for `/dev/null`.
fn marker_path(raw: &str, side_prefix: &str) -> Option<PathBuf> {
    // `--- a/file\t2024-01-01 00:00:00` style timestamps.
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    let raw = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if raw == DEV_NULL {
        return None;
    }
    let path = raw.strip_prefix(side_prefix).unwrap_or(raw);
    Some(PathBuf::from(path))
}

// ---------------------------------------------------------------------------
// Hunks
// ---------------------------------------------------------------------------

struct HunkBuilder {
    hunk: Hunk,
    pending_blank: usize,
}

impl HunkBuilder {
    fn new(hunk: Hunk) -> Self {
        Self {
            hunk,
            pending_blank: 0,
        }
    }

    fn remaining_old(&self) -> usize {
        self.hunk
            .old_lines
            .saturating_sub(self.hunk.consumed() + self.pending_blank)
    }

    fn remaining_new(&self) -> usize {
        self.hunk
            .new_lines
            .saturating_sub(self.hunk.produced() + self.pending_blank)
    }

    fn expects_more(&self) -> bool {
        self.remaining_old() > 0 || self.remaining_new() > 0
    }

    /// Whether `line` belongs to this hunk's body.
    ///
    /// `--- ` and `+++ ` are ambiguous: they stay in the body while the header
    /// counts say more lines are due, unless a `--- ` is directly followed by
    /// a `+++ ` marker.
    fn accepts(&self, line: &str, next: Option<&str>) -> bool {
        if line.starts_with(OLD_FILE_PREFIX) {
            let header_follows = next.is_some_and(|n| n.starts_with(NEW_FILE_PREFIX));
            return !header_follows && self.remaining_old() > 0;
        }
        if line.starts_with(NEW_FILE_PREFIX) {
            return self.remaining_new() > 0;
        }
        line.is_empty() || line.starts_with(['+', '-', ' ', '\\'])
    }

    fn push(&mut self, line: &str) {
        if line.is_empty() {
            self.pending_blank += 1;
            return;
        }
        if line.starts_with('\\') {
            // "\ No newline at end of file" qualifies the line before it.
            self.flush_blank(self.pending_blank);
            match self.hunk.lines.last() {
                Some(PatchLine::Context(_)) => {
                    self.hunk.old_missing_newline = true;
                    self.hunk.new_missing_newline = true;
                }
                Some(PatchLine::Remove(_)) => self.hunk.old_missing_newline = true,
                Some(PatchLine::Add(_)) => self.hunk.new_missing_newline = true,
                None => {}
            }
            return;
        }
        self.flush_blank(self.pending_blank);
        let (prefix, text) = line.split_at(1);
        let text = text.to_owned();
        let patch_line = match prefix {
            "+" => PatchLine::Add(text),
            "-" => PatchLine::Remove(text),
            _ => PatchLine::Context(text),
        };
        self.hunk.lines.push(patch_line);
    }

    fn flush_blank(&mut self, n: usize) {
        for _ in 0..n {
            self.hunk.lines.push(PatchLine::Context(String::new()));
        }
        self.pending_blank = 0;
    }

    fn finish(mut self) -> Hunk {
        // Trailing blanks count as empty context only while the header still
        // expects lines on both sides.
        let pending = self.pending_blank;
        self.pending_blank = 0;
        let keep = pending
            .min(self.remaining_old())
            .min(self.remaining_new());
        self.flush_blank(keep);
        self.hunk
    }
}

/// Parse `@@ -oldStart[,oldLines] +newStart[,newLines] @@ [text]`.
///
/// Missing line counts default to 1.
pub fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.strip_prefix(HUNK_HEADER_PREFIX)?;
    let (ranges, trailer) = match rest.find(HUNK_HEADER_PREFIX) {
        Some(i) => (&rest[..i], Some(rest[i + HUNK_HEADER_PREFIX.len()..].trim())),
        None => (rest, None),
    };

    let mut parts = ranges.split_whitespace();
    let (old_start, old_lines) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(parts.next()?.strip_prefix('+')?)?;

    Some(Hunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
        header: trailer.filter(|t| !t.is_empty()).map(str::to_owned),
        lines: Vec::new(),
        old_missing_newline: false,
        new_missing_newline: false,
    })
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
