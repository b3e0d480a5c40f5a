//! Conflict-checked application of a single [`Patch`] to a file's text.
//!
//! Hunks are replayed in order against the original lines. Every context and
//! remove line must match the file before anything is produced; the first
//! mismatch rejects the whole patch, so a caller only ever sees the fully old
//! or the fully new text.

use std::borrow::Cow;

use driftsync_core::{
    types::{Conflict, Hunk, Patch, PatchLine, PatchResult},
    WhitespaceMode,
};

/// Apply `patch` to `original` with the default (lenient) line comparison.
pub fn apply(original: &str, patch: &Patch) -> PatchResult {
    apply_with(original, patch, WhitespaceMode::default())
}

/// Apply `patch` to `original`, comparing context/remove lines with `mode`.
pub fn apply_with(original: &str, patch: &Patch, mode: WhitespaceMode) -> PatchResult {
    match replay(original, &patch.hunks, mode) {
        Ok(content) => PatchResult::Applied {
            path: patch.path.clone(),
            content,
        },
        Err(conflict) => {
            tracing::debug!("conflict in {}: {conflict}", patch.path.display());
            PatchResult::Rejected {
                path: patch.path.clone(),
                error: format!("patch does not apply at {conflict}"),
                conflicts: vec![conflict],
            }
        }
    }
}

/// Content of a file created by `patch`: every add line, joined with `\n`.
pub fn new_file_content(patch: &Patch) -> String {
    patch
        .hunks
        .iter()
        .flat_map(|h| h.lines.iter())
        .filter_map(|l| match l {
            PatchLine::Add(text) => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn replay(original: &str, hunks: &[Hunk], mode: WhitespaceMode) -> Result<String, Conflict> {
    // An empty file has no unterminated last line.
    let ends_with_newline = original.is_empty() || original.ends_with('\n');
    let mut source: Vec<&str> = original.split('\n').collect();
    if ends_with_newline {
        source.pop();
    }
    let crlf = original.contains("\r\n");
    let mut out: Vec<Cow<'_, str>> = Vec::with_capacity(source.len());
    let mut cursor = 0;
    let mut eof_newline = None;

    for (index, hunk) in hunks.iter().enumerate() {
        let anchor = anchor_line(hunk);
        if anchor < cursor {
            return Err(Conflict {
                line: hunk.old_start,
                reason: format!(
                    "hunk #{} starts before the end of the previous hunk (line {cursor})",
                    index + 1
                ),
            });
        }
        if anchor > source.len() {
            return Err(Conflict {
                line: hunk.old_start,
                reason: format!(
                    "hunk #{} starts past the end of the file ({} lines)",
                    index + 1,
                    source.len()
                ),
            });
        }

        out.extend(source[cursor..anchor].iter().map(|l| Cow::Borrowed(*l)));
        cursor = anchor;

        for line in &hunk.lines {
            match line {
                PatchLine::Context(expected) => {
                    let actual = expect_line(&source, cursor, expected, mode)?;
                    out.push(Cow::Borrowed(actual));
                    cursor += 1;
                }
                PatchLine::Remove(expected) => {
                    expect_line(&source, cursor, expected, mode)?;
                    cursor += 1;
                }
                PatchLine::Add(text) if crlf => out.push(Cow::Owned(format!("{text}\r"))),
                PatchLine::Add(text) => out.push(Cow::Borrowed(text.as_str())),
            }
        }

        // "\ No newline at end of file" markers decide the final newline only
        // when the hunk runs up to the end of the original.
        let marked = hunk.old_missing_newline || hunk.new_missing_newline;
        eof_newline = (marked && cursor == source.len()).then_some(!hunk.new_missing_newline);
    }

    out.extend(source[cursor..].iter().map(|l| Cow::Borrowed(*l)));
    if out.is_empty() {
        return Ok(String::new());
    }
    let mut content = out.join("\n");
    // CRLF lines already carry their `\r`.
    if eof_newline.unwrap_or(ends_with_newline) {
        content.push('\n');
    }
    Ok(content)
}

/// 0-based index of the first original line the hunk touches.
///
/// A hunk with no old lines (`@@ -N,0 …`) inserts *after* line `N`.
fn anchor_line(hunk: &Hunk) -> usize {
    if hunk.old_lines == 0 && hunk.consumed() == 0 {
        hunk.old_start
    } else {
        hunk.old_start.saturating_sub(1)
    }
}

fn expect_line<'a>(
    source: &[&'a str],
    cursor: usize,
    expected: &str,
    mode: WhitespaceMode,
) -> Result<&'a str, Conflict> {
    let line = cursor + 1;
    match source.get(cursor) {
        None => Err(Conflict {
            line,
            reason: format!("unexpected end of file, expected {expected:?}"),
        }),
        Some(&actual) => {
            let text = actual.strip_suffix('\r').unwrap_or(actual);
            if mode.lines_match(expected, text) {
                Ok(actual)
            } else {
                Err(Conflict {
                    line,
                    reason: format!("expected {expected:?}, found {text:?}"),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
