//! Unified diff text generation, in the convention [`crate::parse`] reads.
//!
//! Line diffing is delegated to `similar`; this module only adds the git
//! style file boundary and `/dev/null` markers for creations and deletions.

use std::path::Path;

use similar::TextDiff;

use crate::parser::DEV_NULL;

/// Render the diff turning `old` into `new` for `path`.
///
/// `None` on either side means the file does not exist there, producing a
/// creation (`--- /dev/null`) or deletion (`+++ /dev/null`) section. Returns
/// an empty string when there is nothing to change.
pub fn unified_diff(
    path: &Path,
    old: Option<&str>,
    new: Option<&str>,
    context_radius: usize,
) -> String {
    if old == new {
        return String::new();
    }

    let display = path.display();
    let old_header = match old {
        Some(_) => format!("a/{display}"),
        None => DEV_NULL.to_string(),
    };
    let new_header = match new {
        Some(_) => format!("b/{display}"),
        None => DEV_NULL.to_string(),
    };

    let body = TextDiff::from_lines(old.unwrap_or(""), new.unwrap_or(""))
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(context_radius)
        .to_string();

    let mut out = format!("diff --git a/{display} b/{display}\n");
    if old.is_none() {
        out.push_str("new file mode 100644\n");
    } else if new.is_none() {
        out.push_str("deleted file mode 100644\n");
    }
    if body.is_empty() {
        // Creating or deleting an empty file has no hunks.
        out.push_str(&format!("--- {old_header}\n+++ {new_header}\n"));
    } else {
        out.push_str(&body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn identical_content_produces_nothing() {
        assert_eq!(unified_diff(Path::new("a.txt"), Some("x\n"), Some("x\n"), 3), "");
    }

    #[test]
    fn modification_has_git_headers() {
        let text = unified_diff(Path::new("src/a.rs"), Some("a\nb\n"), Some("a\nc\n"), 3);
        assert!(text.starts_with("diff --git a/src/a.rs b/src/a.rs\n"));
        assert!(text.contains("--- a/src/a.rs\n"));
        assert!(text.contains("+++ b/src/a.rs\n"));
        assert!(text.contains("-b\n+c\n"));
    }

    #[test]
    fn creation_parses_as_new_file() {
        let text = unified_diff(Path::new("new.txt"), None, Some("one\ntwo\n"), 3);
        let patches = parse(&text);
        assert_eq!(patches.len(), 1);
        assert!(patches[0].is_new);
        assert_eq!(patches[0].added_lines(), 2);
    }

    #[test]
    fn deletion_parses_as_deleted_file() {
        let text = unified_diff(Path::new("old.txt"), Some("bye\n"), None, 3);
        let patches = parse(&text);
        assert_eq!(patches.len(), 1);
        assert!(patches[0].is_deleted);
        assert_eq!(patches[0].path, Path::new("old.txt"));
    }

    #[test]
    fn empty_file_creation_still_has_markers() {
        let text = unified_diff(Path::new("empty.txt"), None, Some(""), 3);
        let patches = parse(&text);
        assert!(patches[0].is_new);
        assert!(patches[0].hunks.is_empty());
    }
}
