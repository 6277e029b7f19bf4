// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use crate::syntax::TokenLine;

/// Committed token lines of one session, keyed by line index.
///
/// Sparse: lines that were never tokenized, or whose token line was rejected,
/// have no entry.
#[derive(Debug, Clone, Default)]
pub struct HighlightCache {
    lines: BTreeMap<usize, TokenLine>,
}

impl HighlightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&TokenLine> {
        self.lines.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }

    pub fn insert(&mut self, index: usize, line: TokenLine) {
        self.lines.insert(index, line);
    }

    /// Drops every entry at or after `index`. Returns how many were dropped.
    pub fn evict_from(&mut self, index: usize) -> usize {
        self.lines.split_off(&index).len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TokenLine)> {
        self.lines.iter().map(|(&index, line)| (index, line))
    }
}
