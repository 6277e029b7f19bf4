// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Classification of source text updates.
//!
//! A code block's source is replaced wholesale on every update. Streaming
//! hosts only ever extend it, so an update whose text starts with the previous
//! text is treated as the same document grown longer. Anything else is a new
//! document and invalidates all derived state.

use super::line_store::split;

/// How a new source text relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The text is identical.
    Unchanged,
    /// The new text extends the old one.
    Append,
    /// The new text is unrelated to the old one.
    Replace,
}

/// Description of a source text update, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChange {
    pub kind: ChangeKind,
    /// First line whose text differs between the old and new line lists.
    ///
    /// For appends this is the old line count when only whole lines were
    /// added, or the old last line when a partial trailing line grew.
    pub first_changed_line: usize,
    /// Lines added (positive) or removed (negative).
    pub line_delta: isize,
}

impl SourceChange {
    pub fn unchanged() -> Self {
        Self {
            kind: ChangeKind::Unchanged,
            first_changed_line: 0,
            line_delta: 0,
        }
    }

    pub fn append(first_changed_line: usize, line_delta: isize) -> Self {
        Self {
            kind: ChangeKind::Append,
            first_changed_line,
            line_delta,
        }
    }

    pub fn replace(line_delta: isize) -> Self {
        Self {
            kind: ChangeKind::Replace,
            first_changed_line: 0,
            line_delta,
        }
    }

    /// Returns true if derived state for the old text must be discarded.
    pub fn is_identity_change(&self) -> bool {
        self.kind == ChangeKind::Replace
    }

    pub fn is_unchanged(&self) -> bool {
        self.kind == ChangeKind::Unchanged
    }
}

/// Returns the number of leading lines shared by both lists.
pub(crate) fn common_prefix(old: &[String], new: &[String]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

/// Classifies `new_text` against `old_text`.
///
/// This splits both texts in full. [`LineStore::apply`](super::LineStore::apply)
/// reaches the same answer while only re-splitting the tail.
pub fn classify(old_text: &str, new_text: &str) -> SourceChange {
    if old_text == new_text {
        return SourceChange::unchanged();
    }

    let old_lines = split(old_text);
    let new_lines = split(new_text);
    let line_delta = new_lines.len() as isize - old_lines.len() as isize;

    if new_text.starts_with(old_text) {
        SourceChange::append(common_prefix(&old_lines, &new_lines), line_delta)
    } else {
        SourceChange::replace(line_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged() {
        let change = classify("fn main() {}", "fn main() {}");
        assert_eq!(change, SourceChange::unchanged());
        assert!(change.is_unchanged());
        assert!(!change.is_identity_change());
    }

    #[test]
    fn test_whole_line_append() {
        let change = classify("a\nb\n", "a\nb\nc\nd");
        assert_eq!(change.kind, ChangeKind::Append);
        assert_eq!(change.first_changed_line, 2);
        assert_eq!(change.line_delta, 2);
    }

    #[test]
    fn test_partial_line_append() {
        let change = classify("let x", "let x = 1;");
        assert_eq!(change.kind, ChangeKind::Append);
        assert_eq!(change.first_changed_line, 0);
        assert_eq!(change.line_delta, 0);

        let change = classify("a\nb", "a\nbc\nd");
        assert_eq!(change.first_changed_line, 1);
        assert_eq!(change.line_delta, 1);
    }

    #[test]
    fn test_trailing_whitespace_append_changes_no_lines() {
        let change = classify("a\nb", "a\nb\n\n");
        assert_eq!(change.kind, ChangeKind::Append);
        assert_eq!(change.first_changed_line, 2);
        assert_eq!(change.line_delta, 0);
    }

    #[test]
    fn test_replace() {
        let change = classify("one\ntwo", "uno\ndos");
        assert!(change.is_identity_change());
        assert_eq!(change.line_delta, 0);

        let change = classify("a\nb\nc", "a\nb");
        assert!(change.is_identity_change());
        assert_eq!(change.line_delta, -1);
    }

    #[test]
    fn test_from_empty() {
        let change = classify("", "hello\nworld");
        assert_eq!(change.kind, ChangeKind::Append);
        assert_eq!(change.first_changed_line, 0);
        assert_eq!(change.line_delta, 1);
    }
}
