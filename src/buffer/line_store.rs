// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Line storage for a single code block.

use super::source_change::SourceChange;

/// Splits source text into lines.
///
/// Trailing whitespace of the whole text is trimmed first so that a final
/// newline never produces a phantom row. Internal blank lines are kept, and a
/// `\r` left over from CRLF input is dropped. Empty text yields a single empty
/// line.
pub fn split(text: &str) -> Vec<String> {
    split_lines(text.trim_end())
}

fn split_lines(trimmed: &str) -> Vec<String> {
    trimmed
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// The source text of one code block and the lines derived from it.
///
/// Lines are never edited in place. Every update either re-derives the tail
/// (appends) or replaces the whole list and bumps the [`generation`].
///
/// [`generation`]: LineStore::generation
#[derive(Debug, Clone)]
pub struct LineStore {
    text: String,
    lines: Vec<String>,
    /// Byte offset of the last line within the trimmed text.
    last_line_start: usize,
    generation: u64,
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStore {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        let mut store = Self {
            text: String::new(),
            lines: Vec::new(),
            last_line_start: 0,
            generation: 0,
        };
        store.reload(text);
        store
    }

    /// Replaces the source text and reports how it relates to the old one.
    pub fn apply(&mut self, text: &str) -> SourceChange {
        if text == self.text {
            return SourceChange::unchanged();
        }

        let old_len = self.lines.len();
        if !text.starts_with(self.text.as_str()) {
            self.reload(text);
            self.generation += 1;
            let delta = self.lines.len() as isize - old_len as isize;
            tracing::debug!(
                generation = self.generation,
                lines = self.lines.len(),
                "source replaced"
            );
            return SourceChange::replace(delta);
        }

        self.text.push_str(&text[self.text.len()..]);
        self.extend_tail(old_len)
    }

    /// Appends a chunk of streamed text.
    pub fn append(&mut self, chunk: &str) -> SourceChange {
        if chunk.is_empty() {
            return SourceChange::unchanged();
        }
        let old_len = self.lines.len();
        self.text.push_str(chunk);
        self.extend_tail(old_len)
    }

    /// Re-splits from the start of the old last line after `self.text` grew.
    fn extend_tail(&mut self, old_len: usize) -> SourceChange {
        // Every line but the last is newline-terminated in the old text, so
        // only the last line can have grown.
        let Some(tail) = self.text.trim_end().get(self.last_line_start..) else {
            let text = std::mem::take(&mut self.text);
            self.reload(&text);
            return self.fallback_append(old_len);
        };

        let tail_lines = split_lines(tail);
        let advance = tail.rfind('\n').map_or(0, |i| i + 1);
        let old_last = self.lines.pop().unwrap_or_default();
        let keep = self.lines.len();
        let first_changed_line = if tail_lines.first() == Some(&old_last) {
            keep + 1
        } else {
            keep
        };
        self.last_line_start += advance;
        self.lines.extend(tail_lines);

        SourceChange::append(
            first_changed_line,
            self.lines.len() as isize - old_len as isize,
        )
    }

    /// Drops the text, starting a new identity.
    pub fn clear(&mut self) -> SourceChange {
        if self.text.is_empty() {
            return SourceChange::unchanged();
        }
        let old_len = self.lines.len();
        self.reload("");
        self.generation += 1;
        SourceChange::replace(self.lines.len() as isize - old_len as isize)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the store holds no text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Incremented on every identity change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reload(&mut self, text: &str) {
        let trimmed = text.trim_end();
        self.text = text.to_string();
        self.lines = split_lines(trimmed);
        self.last_line_start = trimmed.rfind('\n').map_or(0, |i| i + 1);
    }

    fn fallback_append(&self, old_len: usize) -> SourceChange {
        SourceChange::append(
            old_len.saturating_sub(1),
            self.lines.len() as isize - old_len as isize,
        )
    }
}
