//! Change summarization: previous + new content → [`ChangeRecord`].
//!
//! The changed region is found with a single prefix/suffix scan, which is
//! exact for one contiguous edit (a typing burst, a paste, a deletion) and
//! over-approximates scattered edits as one wide region. Wide regions push the
//! changed ratio over the threshold and fall back to a resync.

use std::path::Path;

use driftsync_core::types::{ChangeRecord, TrackedFile, UnchangedReason};

/// The single contiguous region where two texts differ, in `char` units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRegion {
    /// Length of the common prefix.
    pub start: usize,
    /// Chars of the old text replaced.
    pub delete_count: usize,
    /// Replacement text taken from the new text.
    pub insert_text: String,
    /// Char length of the old text.
    pub previous_len: usize,
}

impl ChangedRegion {
    /// `(deleted + inserted) / max(1, previous_len)`.
    pub fn changed_ratio(&self) -> f64 {
        let changed = self.delete_count + self.insert_text.chars().count();
        changed as f64 / self.previous_len.max(1) as f64
    }
}

/// Longest common prefix, then longest common suffix of what remains, so the
/// two never overlap.
pub fn changed_region(old: &str, new: &str) -> ChangedRegion {
    let mut prefix_bytes = 0;
    let mut prefix_chars = 0;
    for (a, b) in old.chars().zip(new.chars()) {
        if a != b {
            break;
        }
        prefix_bytes += a.len_utf8();
        prefix_chars += 1;
    }

    let old_rest = &old[prefix_bytes..];
    let new_rest = &new[prefix_bytes..];

    let mut suffix_bytes = 0;
    for (a, b) in old_rest.chars().rev().zip(new_rest.chars().rev()) {
        if a != b {
            break;
        }
        suffix_bytes += a.len_utf8();
    }

    let deleted = &old_rest[..old_rest.len() - suffix_bytes];
    let inserted = &new_rest[..new_rest.len() - suffix_bytes];

    ChangedRegion {
        start: prefix_chars,
        delete_count: deleted.chars().count(),
        insert_text: inserted.to_owned(),
        previous_len: prefix_chars + old_rest.chars().count(),
    }
}

/// Decide how to describe `new_content` given the tracked `previous` state.
///
/// Pure; the caller owns the tracked state and decides whether to store
/// `new_content` (everything except [`UnchangedReason::NoChange`]).
pub fn summarize(
    path: &Path,
    previous: Option<&TrackedFile>,
    language_id: Option<String>,
    new_content: &str,
    change_ratio_threshold: f64,
) -> ChangeRecord {
    let Some(previous) = previous else {
        return ChangeRecord::Snapshot {
            path: path.to_path_buf(),
            language_id,
            content: new_content.to_owned(),
        };
    };

    if previous.content == new_content {
        return ChangeRecord::Unchanged {
            path: path.to_path_buf(),
            reason: UnchangedReason::NoChange,
        };
    }

    let region = changed_region(&previous.content, new_content);
    let ratio = region.changed_ratio();
    if ratio > change_ratio_threshold {
        tracing::debug!(
            "{}: changed ratio {ratio:.2} over {change_ratio_threshold}, requesting resync",
            path.display()
        );
        return ChangeRecord::Unchanged {
            path: path.to_path_buf(),
            reason: UnchangedReason::ResyncRequired,
        };
    }

    ChangeRecord::Delta {
        path: path.to_path_buf(),
        language_id,
        start: region.start,
        delete_count: region.delete_count,
        insert_text: region.insert_text,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(content: &str) -> TrackedFile {
        TrackedFile::new(content, None)
    }

    #[test]
    fn region_for_single_replacement() {
        let r = changed_region("line1\nline2\nline3", "line1\nlineTWO\nline3");
        assert_eq!(r.start, 10);
        assert_eq!(r.delete_count, 1);
        assert_eq!(r.insert_text, "TWO");
    }

    #[test]
    fn suffix_never_overlaps_prefix() {
        let r = changed_region("aaa", "aaaa");
        assert_eq!((r.start, r.delete_count, r.insert_text.as_str()), (3, 0, "a"));

        let r = changed_region("abab", "ab");
        assert_eq!((r.start, r.delete_count, r.insert_text.as_str()), (2, 2, ""));
    }

    #[test]
    fn region_counts_chars_not_bytes() {
        let r = changed_region("naïve café", "naïve cafés");
        assert_eq!(r.start, 10);
        assert_eq!(r.delete_count, 0);
        assert_eq!(r.insert_text, "s");
        assert_eq!(r.previous_len, 10);
    }

    #[test]
    fn first_observation_is_snapshot() {
        let record = summarize(Path::new("a.rs"), None, Some("rust".into()), "fn a() {}", 0.3);
        assert_eq!(
            record,
            ChangeRecord::Snapshot {
                path: "a.rs".into(),
                language_id: Some("rust".into()),
                content: "fn a() {}".into(),
            }
        );
    }

    #[test]
    fn identical_content_is_no_change() {
        let prev = tracked("same");
        let record = summarize(Path::new("a"), Some(&prev), None, "same", 0.3);
        assert!(matches!(
            record,
            ChangeRecord::Unchanged {
                reason: UnchangedReason::NoChange,
                ..
            }
        ));
    }

    #[test]
    fn ratio_exactly_at_threshold_still_deltas() {
        // 3 of 10 chars replaced by nothing: ratio 0.3.
        let prev = tracked("abcdefghij");
        let record = summarize(Path::new("a"), Some(&prev), None, "abcdefg", 0.3);
        assert!(matches!(record, ChangeRecord::Delta { delete_count: 3, .. }));
    }

    #[test]
    fn ratio_over_threshold_requests_resync() {
        let prev = tracked("abcdefghij");
        let record = summarize(Path::new("a"), Some(&prev), None, "abcdef", 0.3);
        assert!(record.requires_resync());
    }

    #[test]
    fn empty_previous_content_uses_denominator_one() {
        let prev = tracked("");
        let record = summarize(Path::new("a"), Some(&prev), None, "x", 1.0);
        assert!(matches!(record, ChangeRecord::Delta { start: 0, .. }));
        let record = summarize(Path::new("a"), Some(&prev), None, "xy", 1.0);
        assert!(record.requires_resync());
    }
}
