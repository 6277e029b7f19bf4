// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Counters for the highlighting pipeline.

use std::time::Duration;

/// Per-session highlighting counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightMetrics {
    /// Tokenizer calls dispatched
    pub requests: usize,
    /// Outcomes committed to the cache
    pub commits: usize,
    /// Outcomes dropped because a newer request superseded them
    pub stale_discards: usize,
    /// Tokenizer calls that returned an error
    pub failures: usize,
    /// Lines whose token line was committed
    pub lines_tokenized: usize,
    /// Token lines rejected for not reproducing their line
    pub rejected_lines: usize,
    /// Total time spent inside the tokenizer
    pub total_time: Duration,
    /// Average tokenizer time per line
    pub avg_time_per_line: Duration,
    /// Slowest single tokenizer call
    pub max_call_time: Duration,
    /// Rows rendered from cached tokens
    pub cache_hits: usize,
    /// Rows rendered raw because nothing was cached yet
    pub cache_misses: usize,
}

impl HighlightMetrics {
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    /// Records a tokenizer call covering `lines` lines.
    pub fn record_call(&mut self, duration: Duration, lines: usize) {
        self.total_time += duration;
        self.lines_tokenized += lines;

        if self.lines_tokenized > 0 {
            self.avg_time_per_line = self.total_time / self.lines_tokenized as u32;
        }

        if duration > self.max_call_time {
            self.max_call_time = duration;
        }
    }

    pub fn record_commit(&mut self) {
        self.commits += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale_discards += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn record_rejected_line(&mut self) {
        self.rejected_lines += 1;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Folds another session's counters into this one.
    pub fn merge(&mut self, other: &HighlightMetrics) {
        self.requests += other.requests;
        self.commits += other.commits;
        self.stale_discards += other.stale_discards;
        self.failures += other.failures;
        self.rejected_lines += other.rejected_lines;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.total_time += other.total_time;
        self.lines_tokenized += other.lines_tokenized;
        if self.lines_tokenized > 0 {
            self.avg_time_per_line = self.total_time / self.lines_tokenized as u32;
        }
        self.max_call_time = self.max_call_time.max(other.max_call_time);
    }

    /// Resets all metrics to zero.
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}
