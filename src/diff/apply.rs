//! Positional hunk application — the preview primitive.
//!
//! `apply_hunks` is a pure function over `(old_content, hunks, approved)`:
//! it computes the content that would result from applying only the
//! approved hunks and leaving everything else untouched. The gateway calls
//! it for every preview request; it never mutates gateway state, so
//! repeated calls are idempotent.

use crate::diff::types::Hunk;
use std::collections::BTreeSet;

/// Split content into lines the same way the diff engine counts them:
/// one final unterminated line still counts, an empty file has no lines.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n').collect()
}

/// Reassemble lines, restoring the original trailing-newline state.
pub(crate) fn join_lines(lines: &[&str], trailing_newline: bool) -> String {
    let mut joined = lines.join("\n");
    if trailing_newline && !joined.is_empty() {
        joined.push('\n');
    }
    joined
}

/// Apply only the hunks whose ids appear in `approved`, by line-range
/// offset. Hunks whose recorded range no longer fits the content are
/// skipped rather than misapplied.
///
/// Callers that approved every hunk should prefer the diff's
/// `new_content`, which also carries newline-at-EOF changes the
/// line-level hunk model cannot express.
pub fn apply_hunks(old_content: &str, hunks: &[Hunk], approved: &BTreeSet<String>) -> String {
    let old_lines = split_lines(old_content);

    let mut ordered: Vec<&Hunk> = hunks.iter().collect();
    ordered.sort_by_key(|h| h.old_start);

    let mut out: Vec<&str> = Vec::with_capacity(old_lines.len());
    let mut cursor = 0usize;

    for hunk in ordered {
        if !approved.contains(&hunk.id) {
            continue;
        }
        let end = hunk.old_start + hunk.deletions();
        if hunk.old_start < cursor || end > old_lines.len() {
            tracing::debug!(hunk = %hunk.id, "hunk range does not fit content, skipping");
            continue;
        }
        out.extend(&old_lines[cursor..hunk.old_start]);
        out.extend(hunk.new_lines.iter().map(String::as_str));
        cursor = end;
    }
    out.extend(&old_lines[cursor..]);

    join_lines(&out, old_content.ends_with('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk(id: &str, old_start: usize, old: &[&str], new: &[&str]) -> Hunk {
        Hunk {
            id: id.to_string(),
            old_start,
            old_lines: old.iter().map(|s| s.to_string()).collect(),
            new_lines: new.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn approved(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_hunk_applied() {
        let h = hunk("hunk-0", 1, &["B"], &["X"]);
        let result = apply_hunks("A\nB\nC", &[h], &approved(&["hunk-0"]));
        assert_eq!(result, "A\nX\nC");
    }

    #[test]
    fn test_no_hunks_approved_returns_old_content() {
        let h = hunk("hunk-0", 1, &["B"], &["X"]);
        let result = apply_hunks("A\nB\nC", &[h], &BTreeSet::new());
        assert_eq!(result, "A\nB\nC");
    }

    #[test]
    fn test_subset_of_hunks() {
        let hunks = vec![
            hunk("hunk-0", 0, &["A"], &["A2"]),
            hunk("hunk-1", 2, &["C"], &["C2"]),
        ];
        let result = apply_hunks("A\nB\nC", &hunks, &approved(&["hunk-1"]));
        assert_eq!(result, "A\nB\nC2");
    }

    #[test]
    fn test_application_is_positional_not_content_matched() {
        // Two identical lines; only the second is covered by the hunk.
        let h = hunk("hunk-0", 2, &["same"], &["changed"]);
        let result = apply_hunks("same\nother\nsame", &[h], &approved(&["hunk-0"]));
        assert_eq!(result, "same\nother\nchanged");
    }

    #[test]
    fn test_insertion_hunk() {
        let h = hunk("hunk-0", 1, &[], &["inserted"]);
        let result = apply_hunks("A\nB", &[h], &approved(&["hunk-0"]));
        assert_eq!(result, "A\ninserted\nB");
    }

    #[test]
    fn test_deletion_hunk() {
        let h = hunk("hunk-0", 1, &["B"], &[]);
        let result = apply_hunks("A\nB\nC", &[h], &approved(&["hunk-0"]));
        assert_eq!(result, "A\nC");
    }

    #[test]
    fn test_trailing_newline_preserved() {
        let h = hunk("hunk-0", 0, &["A"], &["B"]);
        assert_eq!(apply_hunks("A\n", &[h.clone()], &approved(&["hunk-0"])), "B\n");
        assert_eq!(apply_hunks("A", &[h], &approved(&["hunk-0"])), "B");
    }

    #[test]
    fn test_out_of_range_hunk_skipped() {
        let h = hunk("hunk-0", 10, &["nope"], &["x"]);
        let result = apply_hunks("A\nB", &[h], &approved(&["hunk-0"]));
        assert_eq!(result, "A\nB");
    }

    #[test]
    fn test_split_lines_edge_cases() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("A"), vec!["A"]);
        assert_eq!(split_lines("A\n"), vec!["A"]);
        assert_eq!(split_lines("A\n\nB"), vec!["A", "", "B"]);
    }
}
