// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Row virtualization for a vertically scrolling code block.
//!
//! Rows start with an estimated height and switch to their measured height
//! once the host reports it. Row offsets are prefix sums that are rebuilt
//! lazily from the lowest row whose size changed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

use crate::highlight::CallerId;

/// Vertical distance in pixels.
pub type Px = u32;

/// Measurement key of a row: the owning block plus the line index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub caller: CallerId,
    pub index: usize,
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.caller, self.index)
    }
}

/// A row to render, positioned absolutely within the scroll container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualRow {
    pub index: usize,
    pub key: RowKey,
    pub start: Px,
    pub size: Px,
}

impl VirtualRow {
    pub fn end(&self) -> Px {
        self.start.saturating_add(self.size)
    }
}

#[derive(Debug, Default)]
struct Layout {
    /// `starts[i]` is the offset of row `i`; `starts[count]` is the content end.
    starts: Vec<Px>,
    /// Entries at or after this index are out of date.
    dirty_from: usize,
}

/// Computes which rows of a code block need rendering.
#[derive(Debug)]
pub struct Virtualizer {
    caller: CallerId,
    count: usize,
    estimate: Px,
    overscan: usize,
    padding_start: Px,
    padding_end: Px,
    scroll_offset: Px,
    viewport_height: Px,
    measured: HashMap<RowKey, Px>,
    layout: RefCell<Layout>,
}

impl Virtualizer {
    pub fn new(caller: CallerId, count: usize, estimate: Px, overscan: usize) -> Self {
        Self {
            caller,
            count,
            estimate,
            overscan,
            padding_start: 0,
            padding_end: 0,
            scroll_offset: 0,
            viewport_height: 0,
            measured: HashMap::new(),
            layout: RefCell::new(Layout::default()),
        }
    }

    pub fn caller(&self) -> CallerId {
        self.caller
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn estimate(&self) -> Px {
        self.estimate
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn scroll_offset(&self) -> Px {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> Px {
        self.viewport_height
    }

    pub fn key(&self, index: usize) -> RowKey {
        RowKey {
            caller: self.caller,
            index,
        }
    }

    /// Returns the size used for `index`: measured if known, else estimated.
    pub fn size_of(&self, index: usize) -> Px {
        self.measured
            .get(&self.key(index))
            .copied()
            .unwrap_or(self.estimate)
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.contains_key(&self.key(index))
    }

    /// Changes the row count, keeping measurements of rows that remain.
    pub fn set_count(&mut self, count: usize) {
        if count == self.count {
            return;
        }
        if count < self.count {
            self.measured.retain(|key, _| key.index < count);
        }
        self.invalidate(self.count.min(count));
        self.count = count;
        self.clamp_scroll();
    }

    /// Changes the size estimate. Measurements are dropped, since they were
    /// taken at the old font metrics.
    pub fn set_estimate(&mut self, estimate: Px) {
        if estimate != self.estimate {
            self.estimate = estimate;
            self.reset();
        }
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }

    pub fn set_padding(&mut self, start: Px, end: Px) {
        self.padding_start = start;
        self.padding_end = end;
        self.invalidate(0);
        self.clamp_scroll();
    }

    /// Drops measurements of rows at or after `index`.
    pub fn forget_from(&mut self, index: usize) {
        let before = self.measured.len();
        self.measured.retain(|key, _| key.index < index);
        if self.measured.len() != before {
            self.invalidate(index);
            self.clamp_scroll();
        }
    }

    /// Drops every measurement.
    pub fn reset(&mut self) {
        self.measured.clear();
        self.invalidate(0);
        self.clamp_scroll();
    }

    pub fn scroll_to_offset(&mut self, offset: Px) {
        self.scroll_offset = offset;
        self.clamp_scroll();
    }

    pub fn set_viewport_height(&mut self, height: Px) {
        self.viewport_height = height;
        self.clamp_scroll();
    }

    /// Records the rendered size of a row.
    ///
    /// If the row starts above the scroll offset the offset moves by the size
    /// difference, keeping the visible content in place. Returns the applied
    /// scroll adjustment so the host can mirror it.
    pub fn measure(&mut self, index: usize, size: Px) -> i64 {
        if index >= self.count {
            return 0;
        }
        let old = self.size_of(index);
        self.measured.insert(self.key(index), size);
        if old == size {
            return 0;
        }

        let start = self.start_of(index);
        self.invalidate(index + 1);
        let delta = size as i64 - old as i64;
        if start >= self.scroll_offset {
            return 0;
        }

        let before = self.scroll_offset;
        self.scroll_offset = (self.scroll_offset as i64 + delta).clamp(0, Px::MAX as i64) as Px;
        self.clamp_scroll();
        let applied = self.scroll_offset as i64 - before as i64;
        tracing::trace!(caller = %self.caller, index, delta, applied, "scroll adjusted for measurement");
        applied
    }

    /// Height of all rows plus padding.
    pub fn total_size(&self) -> Px {
        self.with_layout(|starts| starts[self.count])
            .saturating_add(self.padding_end)
    }

    /// Offset of row `index`. Indices past the end report the content end.
    pub fn start_of(&self, index: usize) -> Px {
        self.with_layout(|starts| starts[index.min(self.count)])
    }

    /// Rows intersecting the viewport, without overscan.
    pub fn visible_range(&self) -> Range<usize> {
        if self.count == 0 || self.viewport_height == 0 {
            return 0..0;
        }
        let top = self.scroll_offset;
        let bottom = top.saturating_add(self.viewport_height);
        self.with_layout(|starts| {
            let first = starts[1..].partition_point(|&end| end <= top);
            let last = starts[..self.count].partition_point(|&start| start < bottom);
            if last <= first { 0..0 } else { first..last }
        })
    }

    /// Rows to render: the visible range widened by the overscan on both
    /// sides, clamped to `[0, count)`.
    pub fn range(&self) -> Range<usize> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return 0..0;
        }
        let start = visible.start.saturating_sub(self.overscan);
        let end = visible.end.saturating_add(self.overscan).min(self.count);
        start..end
    }

    pub fn rows(&self) -> Vec<VirtualRow> {
        let range = self.range();
        self.with_layout(|starts| {
            range
                .map(|index| VirtualRow {
                    index,
                    key: self.key(index),
                    start: starts[index],
                    size: starts[index + 1] - starts[index],
                })
                .collect()
        })
    }

    fn invalidate(&self, from: usize) {
        let mut layout = self.layout.borrow_mut();
        layout.dirty_from = layout.dirty_from.min(from);
    }

    fn with_layout<R>(&self, f: impl FnOnce(&[Px]) -> R) -> R {
        let mut layout = self.layout.borrow_mut();
        let Layout { starts, dirty_from } = &mut *layout;
        let len = self.count + 1;
        if starts.len() != len || *dirty_from < len {
            let from = (*dirty_from).min(starts.len()).min(self.count);
            starts.resize(len, 0);
            if from == 0 {
                starts[0] = self.padding_start;
            }
            for index in from.max(1)..len {
                let start = starts[index - 1].saturating_add(self.size_of(index - 1));
                starts[index] = start;
            }
            *dirty_from = len;
        }
        f(starts)
    }

    fn clamp_scroll(&mut self) {
        let max = self.total_size().saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.min(max);
    }
}
