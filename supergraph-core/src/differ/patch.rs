//! Unified-diff patches for CHANGED markers.
//!
//! Patches are read from the original source roots at diff time. Failures
//! never abort a run: the marker simply carries no patch.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::markers::{DiffMarker, DiffStatus, LineRange};
use crate::error::{Result, SupergraphError};

/// Default character budget for one patch.
pub const DEFAULT_MAX_PATCH_CHARS: usize = 50_000;

/// Lines of context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Appended to a patch cut at the character budget.
pub const TRUNCATION_MARKER: &str = "\n... (diff truncated)";

const NULL_PATH: &str = "dev/null";

/// Where to read both sides from and how large a patch may get.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchOptions {
    pub left_root: PathBuf,
    pub right_root: PathBuf,
    pub max_chars: usize,
}

impl PatchOptions {
    pub fn new(left_root: impl Into<PathBuf>, right_root: impl Into<PathBuf>) -> Self {
        Self {
            left_root: left_root.into(),
            right_root: right_root.into(),
            max_chars: DEFAULT_MAX_PATCH_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// Fill in `diff` on every CHANGED marker, in parallel.
pub fn attach_patches(markers: &mut [DiffMarker], options: &PatchOptions) {
    markers
        .par_iter_mut()
        .filter(|m| m.status == DiffStatus::Changed)
        .for_each(|marker| match marker_patch(marker, options) {
            Ok(Some(patch)) => {
                let (text, truncated) = truncate_patch(&patch, options.max_chars);
                marker.diff = Some(text);
                marker.truncated = truncated;
            }
            Ok(None) => {}
            Err(e) => warn!("{} {}: {}", marker.kind.as_str(), marker.key, e),
        });
}

/// Patch for one marker: a line-range diff when both ranges are known,
/// otherwise a whole-file diff.
pub fn marker_patch(marker: &DiffMarker, options: &PatchOptions) -> Result<Option<String>> {
    let left = marker.left_file.as_deref();
    let right = marker.right_file.as_deref();
    match (marker.left_range, marker.right_range, left, right) {
        (Some(left_range), Some(right_range), Some(left), Some(right)) => range_patch(
            &options.left_root,
            left,
            left_range,
            &options.right_root,
            right,
            right_range,
        ),
        _ => whole_file_patch(&options.left_root, left, &options.right_root, right),
    }
}

/// Whole-file unified diff. A side with no file diffs as empty.
pub fn whole_file_patch(
    left_root: &Path,
    left: Option<&str>,
    right_root: &Path,
    right: Option<&str>,
) -> Result<Option<String>> {
    let left_text = match left {
        Some(rel) => read_source(left_root, rel)?,
        None => String::new(),
    };
    let right_text = match right {
        Some(rel) => read_source(right_root, rel)?,
        None => String::new(),
    };

    let left_header = format!("a/{}", left.unwrap_or(NULL_PATH));
    let right_header = format!("b/{}", right.unwrap_or(NULL_PATH));
    Ok(unified(&left_text, &right_text, &left_header, &right_header))
}

/// Diff of two line ranges, 1-indexed and inclusive.
pub fn range_patch(
    left_root: &Path,
    left: &str,
    left_range: LineRange,
    right_root: &Path,
    right: &str,
    right_range: LineRange,
) -> Result<Option<String>> {
    let left_text = read_source(left_root, left)?;
    let right_text = read_source(right_root, right)?;

    let (left_slice, lb, le) = slice_lines(&left_text, left_range);
    let (right_slice, rb, re) = slice_lines(&right_text, right_range);

    let left_header = format!("a/{}:{}-{}", left, lb, le);
    let right_header = format!("b/{}:{}-{}", right, rb, re);
    Ok(unified(&left_slice, &right_slice, &left_header, &right_header))
}

/// Cut `patch` at `max_chars` characters and append the truncation marker.
pub fn truncate_patch(patch: &str, max_chars: usize) -> (String, bool) {
    match patch.char_indices().nth(max_chars) {
        Some((idx, _)) => (format!("{}{}", &patch[..idx], TRUNCATION_MARKER), true),
        None => (patch.to_string(), false),
    }
}

fn unified(left: &str, right: &str, left_header: &str, right_header: &str) -> Option<String> {
    let diff = TextDiff::from_lines(left, right);
    let text = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(left_header, right_header)
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn read_source(root: &Path, rel: &str) -> Result<String> {
    let path = root.join(rel);
    let bytes = fs::read(&path).map_err(|e| SupergraphError::PatchGeneration {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Clamp the range to the text and return the selected lines with the
/// effective bounds.
fn slice_lines(text: &str, range: LineRange) -> (String, u32, u32) {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let begin = range.begin.max(1);
    let end = range.end.max(begin).min(lines.len() as u32);

    if (begin as usize) > lines.len() {
        return (String::new(), begin, begin);
    }

    // Line endings are kept as-is; only a missing final newline is added.
    let mut out = lines[(begin as usize - 1)..(end as usize)].concat();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    (out, begin, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::markers::EntityKind;
    use tempfile::TempDir;

    fn roots() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    #[test]
    fn test_whole_file_patch() {
        let (left, right) = roots();
        fs::write(left.path().join("A.java"), "class A {\n  void f() {}\n}\n").unwrap();
        fs::write(right.path().join("A.java"), "class A {\n  int f() { return 1; }\n}\n").unwrap();

        let patch = whole_file_patch(left.path(), Some("A.java"), right.path(), Some("A.java"))
            .unwrap()
            .unwrap();
        assert!(patch.starts_with("--- a/A.java\n+++ b/A.java\n"));
        assert!(patch.contains("-  void f() {}"));
        assert!(patch.contains("+  int f() { return 1; }"));
    }

    #[test]
    fn test_identical_files_have_no_patch() {
        let (left, right) = roots();
        fs::write(left.path().join("A.java"), "class A {}\n").unwrap();
        fs::write(right.path().join("A.java"), "class A {}\n").unwrap();
        assert!(whole_file_patch(left.path(), Some("A.java"), right.path(), Some("A.java"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_side_diffs_against_empty() {
        let (left, right) = roots();
        fs::write(right.path().join("B.java"), "class B {}\n").unwrap();
        let patch = whole_file_patch(left.path(), None, right.path(), Some("B.java"))
            .unwrap()
            .unwrap();
        assert!(patch.starts_with("--- a/dev/null\n+++ b/B.java\n"));
        assert!(patch.contains("+class B {}"));
    }

    #[test]
    fn test_unreadable_file_is_patch_error() {
        let (left, right) = roots();
        let err = whole_file_patch(left.path(), Some("Gone.java"), right.path(), Some("Gone.java"))
            .unwrap_err();
        assert!(matches!(err, SupergraphError::PatchGeneration { .. }));
    }

    #[test]
    fn test_range_patch_is_scoped() {
        let (left, right) = roots();
        let body = |ret: &str| {
            format!(
                "class A {{\n  int keep = 1;\n  {} f() {{\n    work();\n  }}\n  int other = 2;\n}}\n",
                ret
            )
        };
        fs::write(left.path().join("A.java"), body("void")).unwrap();
        fs::write(right.path().join("A.java"), body("int")).unwrap();

        let range = LineRange { begin: 3, end: 5 };
        let patch = range_patch(left.path(), "A.java", range, right.path(), "A.java", range)
            .unwrap()
            .unwrap();
        assert!(patch.starts_with("--- a/A.java:3-5\n+++ b/A.java:3-5\n"));
        assert!(patch.contains("-  void f() {"));
        assert!(!patch.contains("keep"));
        assert!(!patch.contains("other"));
    }

    #[test]
    fn test_slice_lines_clamps() {
        let text = "a\nb\nc\n";
        assert_eq!(slice_lines(text, LineRange { begin: 0, end: 2 }), ("a\nb\n".to_string(), 1, 2));
        assert_eq!(slice_lines(text, LineRange { begin: 2, end: 99 }), ("b\nc\n".to_string(), 2, 3));
        assert_eq!(slice_lines(text, LineRange { begin: 9, end: 12 }), (String::new(), 9, 9));

        let crlf = "a\r\nb\r\nc";
        assert_eq!(slice_lines(crlf, LineRange { begin: 1, end: 2 }), ("a\r\nb\r\n".to_string(), 1, 2));
        assert_eq!(slice_lines(crlf, LineRange { begin: 3, end: 5 }), ("c\n".to_string(), 3, 3));
    }

    #[test]
    fn test_truncate_patch() {
        assert_eq!(truncate_patch("short", 10), ("short".to_string(), false));

        let (text, truncated) = truncate_patch("ééééé", 2);
        assert!(truncated);
        assert_eq!(text, format!("éé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_attach_patches_only_changed() {
        let (left, right) = roots();
        fs::write(left.path().join("A.java"), "class A { int x; }\n").unwrap();
        fs::write(right.path().join("A.java"), "class A { long x; }\n").unwrap();

        let files = || (Some("A.java".to_string()), Some("A.java".to_string()));
        let (l, r) = files();
        let changed = DiffMarker::new("cmp", EntityKind::Type, "A".to_string(), DiffStatus::Changed)
            .with_files(l, r);
        let (l, r) = files();
        let unchanged =
            DiffMarker::new("cmp", EntityKind::Field, "A::y".to_string(), DiffStatus::Unchanged)
                .with_files(l, r);
        let missing = DiffMarker::new("cmp", EntityKind::Type, "B".to_string(), DiffStatus::Changed)
            .with_files(Some("B.java".to_string()), Some("B.java".to_string()));

        let mut markers = vec![changed, unchanged, missing];
        let options = PatchOptions::new(left.path(), right.path()).with_max_chars(20);
        attach_patches(&mut markers, &options);

        assert!(markers[0].truncated);
        assert!(markers[0].diff.as_deref().unwrap().ends_with(TRUNCATION_MARKER));
        assert!(markers[1].diff.is_none());
        assert!(markers[2].diff.is_none());
    }
}
