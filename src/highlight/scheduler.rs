// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-session highlight scheduling.
//!
//! The scheduler keeps a watermark: every line below it has been tokenized for
//! the current text. When the viewport reaches past the watermark a request is
//! armed on a trailing debounce. Once the debounce fires only the uncached
//! range `[watermark, target)` is sent to the tokenizer.
//!
//! Every newly armed request and every identity reset bumps the epoch. An
//! outcome is committed only if it carries the live epoch, so an older request
//! finishing late can never overwrite a newer one.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::buffer::{ChangeKind, SourceChange};
use crate::highlight::cache::HighlightCache;
use crate::highlight::debounce::Debouncer;
use crate::highlight::worker::{Spawner, TokenizeJob, TokenizeOutcome};
use crate::highlight::CallerId;
use crate::syntax::{HighlightMetrics, TokenLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    epoch: u64,
    end: usize,
}

/// What a call to [`HighlightScheduler::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Range sent to the tokenizer, if a request was dispatched.
    pub dispatched: Option<Range<usize>>,
    /// Visible rows whose token line was just committed.
    pub updated: Vec<usize>,
}

impl TickOutcome {
    pub fn is_empty(&self) -> bool {
        self.dispatched.is_none() && self.updated.is_empty()
    }
}

/// Highlighting state of one code block.
pub struct HighlightScheduler {
    caller: CallerId,
    language: String,
    spawner: Arc<dyn Spawner>,
    cache: HighlightCache,
    /// Lines below this index are tokenized for the current text.
    watermark: usize,
    epoch: u64,
    debounce: Debouncer<usize>,
    in_flight: Option<InFlight>,
    /// Most recent viewport target, re-requested after resets and appends.
    last_target: usize,
    visible: Range<usize>,
    replies: Receiver<TokenizeOutcome>,
    reply_tx: Sender<TokenizeOutcome>,
    metrics: HighlightMetrics,
}

impl HighlightScheduler {
    pub fn new(
        caller: CallerId,
        language: impl Into<String>,
        spawner: Arc<dyn Spawner>,
        debounce: Duration,
    ) -> Self {
        let (reply_tx, replies) = crossbeam_channel::unbounded();
        Self {
            caller,
            language: language.into(),
            spawner,
            cache: HighlightCache::new(),
            watermark: 0,
            epoch: 0,
            debounce: Debouncer::new(debounce),
            in_flight: None,
            last_target: 0,
            visible: 0..0,
            replies,
            reply_tx,
            metrics: HighlightMetrics::default(),
        }
    }

    pub fn caller(&self) -> CallerId {
        self.caller
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Lines tokenized, armed or in flight.
    pub fn coverage(&self) -> usize {
        let pending = self.debounce.pending().copied().unwrap_or(0);
        let in_flight = self.in_flight.map_or(0, |f| f.end);
        self.watermark.max(pending).max(in_flight)
    }

    pub fn token_line(&self, index: usize) -> Option<&TokenLine> {
        self.cache.get(index)
    }

    pub fn cache(&self) -> &HighlightCache {
        &self.cache
    }

    pub fn metrics(&self) -> &HighlightMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut HighlightMetrics {
        &mut self.metrics
    }

    pub fn set_debounce(&mut self, delay: Duration) {
        self.debounce.set_delay(delay);
    }

    /// When the armed request becomes due, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Returns true if nothing is armed or in flight.
    pub fn is_idle(&self) -> bool {
        !self.debounce.is_armed() && self.in_flight.is_none()
    }

    /// Asks for every line below `target` to be highlighted.
    ///
    /// Returns true if a new request was armed. Targets already covered are
    /// ignored, so repeating a target costs nothing.
    pub fn request_through(&mut self, target: usize, now: Instant) -> bool {
        self.last_target = target;
        if target <= self.coverage() {
            return false;
        }

        self.epoch += 1;
        self.debounce.arm(target, now);
        tracing::trace!(
            caller = %self.caller,
            epoch = self.epoch,
            target,
            watermark = self.watermark,
            "highlight request armed"
        );
        true
    }

    /// Feeds the rendered row range from the virtualizer.
    pub fn on_rows(&mut self, rows: Range<usize>, now: Instant) -> bool {
        self.visible = rows.clone();
        if rows.is_empty() {
            return false;
        }
        self.request_through(rows.end, now)
    }

    /// Adjusts to a change of the source text.
    ///
    /// A replacement resets everything. For an append, entries at or after
    /// the first changed line are evicted; that only happens when a partial
    /// trailing line grew, so whole-line appends keep the watermark in place.
    pub fn on_source_change(&mut self, change: &SourceChange, now: Instant) {
        match change.kind {
            ChangeKind::Unchanged => {}
            ChangeKind::Replace => self.reset(now),
            ChangeKind::Append => {
                let first = change.first_changed_line;
                let evicted = self.cache.evict_from(first);
                if first < self.watermark {
                    tracing::trace!(
                        caller = %self.caller,
                        from = self.watermark,
                        to = first,
                        evicted,
                        "watermark lowered by tail edit"
                    );
                    self.watermark = first;
                }
                self.request_through(self.last_target, now);
            }
        }
    }

    /// Discards everything derived from the old text.
    pub fn reset(&mut self, now: Instant) {
        self.cache.clear();
        self.watermark = 0;
        self.epoch += 1;
        self.debounce.cancel();
        self.in_flight = None;
        tracing::debug!(caller = %self.caller, epoch = self.epoch, "highlight state reset");
        self.request_through(self.last_target, now);
    }

    /// Switches language. A different language is a new identity.
    pub fn set_language(&mut self, language: &str, now: Instant) {
        if self.language != language {
            self.language = language.to_string();
            self.reset(now);
        }
    }

    /// Fires a due request and commits finished outcomes.
    ///
    /// `lines` must be the current line list of the session's text.
    pub fn tick(&mut self, lines: &[String], now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let Some(target) = self.debounce.fire(now) {
            outcome.dispatched = self.dispatch(lines, target);
        }

        while let Ok(reply) = self.replies.try_recv() {
            self.commit(reply, lines, &mut outcome.updated);
        }

        // Lines capped by a tail edit are picked up again here.
        let target = self.last_target.min(lines.len());
        if target > self.coverage() {
            self.request_through(target, now);
        }

        outcome.updated.sort_unstable();
        outcome.updated.dedup();
        outcome
    }

    fn dispatch(&mut self, lines: &[String], target: usize) -> Option<Range<usize>> {
        let start = self.watermark;
        let end = target.min(lines.len());
        if start >= end {
            return None;
        }

        let job = TokenizeJob {
            caller: self.caller,
            epoch: self.epoch,
            start,
            lines: lines[start..end].to_vec(),
            language: self.language.clone(),
            reply: self.reply_tx.clone(),
        };

        self.metrics.record_request();
        self.in_flight = Some(InFlight {
            epoch: self.epoch,
            end,
        });
        tracing::debug!(
            caller = %self.caller,
            epoch = self.epoch,
            range = ?(start..end),
            "highlight request dispatched"
        );

        if let Err(err) = self.spawner.spawn(job) {
            tracing::warn!(
                caller = %self.caller,
                range = ?(start..end),
                error = %err,
                "failed to dispatch tokenizer job; lines stay unstyled"
            );
            self.metrics.record_failure();
            self.in_flight = None;
            self.watermark = self.watermark.max(end);
        }

        Some(start..end)
    }

    fn commit(&mut self, reply: TokenizeOutcome, lines: &[String], updated: &mut Vec<usize>) {
        let range = reply.range();
        if reply.epoch != self.epoch {
            tracing::debug!(
                caller = %self.caller,
                epoch = reply.epoch,
                live_epoch = self.epoch,
                range = ?range,
                "stale highlight result dropped"
            );
            self.metrics.record_stale();
            return;
        }

        self.in_flight = None;
        self.metrics.record_call(reply.elapsed, reply.lines.len());

        let token_lines = match reply.result {
            Ok(token_lines) => token_lines,
            Err(err) => {
                tracing::warn!(
                    caller = %self.caller,
                    epoch = reply.epoch,
                    range = ?range,
                    error = %err,
                    "tokenizer failed; lines stay unstyled"
                );
                self.metrics.record_failure();
                self.watermark = self.watermark.max(range.end);
                return;
            }
        };

        let mut covered = range.end;
        for (offset, (token_line, sent)) in token_lines.into_iter().zip(&reply.lines).enumerate() {
            let index = reply.start + offset;
            if lines.get(index) != Some(sent) {
                // The line changed after the job was sent; retry from here.
                covered = index;
                break;
            }
            if !token_line.round_trips(sent) {
                self.metrics.record_rejected_line();
                continue;
            }
            self.cache.insert(index, token_line);
            if self.visible.contains(&index) {
                updated.push(index);
            }
        }

        self.watermark = self.watermark.max(covered);
        self.metrics.record_commit();
        tracing::trace!(
            caller = %self.caller,
            epoch = reply.epoch,
            watermark = self.watermark,
            "highlight result committed"
        );
    }
}

impl std::fmt::Debug for HighlightScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightScheduler")
            .field("caller", &self.caller)
            .field("language", &self.language)
            .field("watermark", &self.watermark)
            .field("epoch", &self.epoch)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use proptest::prelude::*;

    use super::*;
    use crate::buffer::LineStore;
    use crate::highlight::worker::InlineSpawner;
    use crate::highlight::worker::testing::{ManualSpawner, WordTokenizer};

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("line {i}")).collect()
    }

    fn manual() -> (Arc<ManualSpawner>, HighlightScheduler) {
        let spawner = Arc::new(ManualSpawner::default());
        let scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner.clone(), DEBOUNCE);
        (spawner, scheduler)
    }

    #[test]
    fn test_single_request_after_debounce() {
        let (spawner, mut scheduler) = manual();
        let lines = numbered(500);
        let t0 = Instant::now();

        assert!(scheduler.on_rows(80..141, t0));
        assert!(scheduler.tick(&lines, t0 + Duration::from_millis(299)).is_empty());
        assert_eq!(spawner.pending(), 0);

        let outcome = scheduler.tick(&lines, t0 + DEBOUNCE);
        assert_eq!(outcome.dispatched, Some(0..141));
        let requests = spawner.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].2, 0..141);

        // Viewport stays put: nothing more is requested.
        assert!(!scheduler.on_rows(80..141, t0 + DEBOUNCE));
        scheduler.tick(&lines, t0 + Duration::from_secs(1));
        assert_eq!(spawner.requests().len(), 1);
    }

    #[test]
    fn test_burst_coalesces() {
        let (spawner, mut scheduler) = manual();
        let lines = numbered(500);
        let t0 = Instant::now();

        for step in 0..10u64 {
            let end = 50 + step as usize * 10;
            scheduler.on_rows(end - 40..end, t0 + Duration::from_millis(step * 50));
            scheduler.tick(&lines, t0 + Duration::from_millis(step * 50));
        }
        assert_eq!(spawner.pending(), 0);

        scheduler.tick(&lines, t0 + Duration::from_millis(450) + DEBOUNCE);
        assert_eq!(spawner.requests().len(), 1);
        assert_eq!(spawner.requests()[0].2, 0..140);
    }

    #[test]
    fn test_commit_reports_visible_rows() {
        let (spawner, mut scheduler) = manual();
        let tokenizer = WordTokenizer::default();
        let lines = numbered(100);
        let t0 = Instant::now();

        scheduler.on_rows(0..30, t0);
        scheduler.tick(&lines, t0 + DEBOUNCE);
        // Viewport moves a little before the result lands, inside coverage.
        scheduler.on_rows(10..30, t0 + DEBOUNCE);
        spawner.complete_all(&tokenizer);

        let outcome = scheduler.tick(&lines, t0 + DEBOUNCE);
        assert_eq!(outcome.updated, (10..30).collect::<Vec<_>>());
        assert_eq!(scheduler.watermark(), 30);
        assert_eq!(scheduler.cache().len(), 30);
        for (index, token_line) in scheduler.cache().iter() {
            assert!(token_line.round_trips(&lines[index]));
        }
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let (spawner, mut scheduler) = manual();
        let tokenizer = WordTokenizer::default();
        let lines = numbered(200);
        let t0 = Instant::now();

        scheduler.on_rows(0..50, t0);
        scheduler.tick(&lines, t0 + DEBOUNCE);
        let first_epoch = scheduler.epoch();

        let t1 = t0 + Duration::from_millis(400);
        scheduler.on_rows(50..120, t1);
        scheduler.tick(&lines, t1 + DEBOUNCE);
        assert_eq!(spawner.pending(), 2);
        assert!(scheduler.epoch() > first_epoch);

        // Newer request finishes first, older one straggles in afterwards.
        spawner.complete(1, &tokenizer);
        scheduler.tick(&lines, t1 + DEBOUNCE);
        let after_newer: Vec<_> = scheduler.cache().iter().map(|(i, l)| (i, l.clone())).collect();
        assert_eq!(scheduler.watermark(), 120);

        spawner.complete(0, &tokenizer);
        scheduler.tick(&lines, t1 + DEBOUNCE);
        let after_both: Vec<_> = scheduler.cache().iter().map(|(i, l)| (i, l.clone())).collect();

        assert_eq!(after_newer, after_both);
        assert_eq!(scheduler.watermark(), 120);
        assert_eq!(scheduler.metrics().stale_discards, 1);
        assert_eq!(scheduler.metrics().commits, 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let spawner = Arc::new(InlineSpawner::new(Arc::new(WordTokenizer::default())));
        let mut a = HighlightScheduler::new(CallerId::next(), "text", spawner.clone(), DEBOUNCE);
        let mut b = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let lines = numbered(20);
        let t0 = Instant::now();

        a.on_rows(0..20, t0);
        b.on_rows(0..20, t0);
        a.tick(&lines, t0 + DEBOUNCE);
        b.tick(&lines, t0 + DEBOUNCE);
        assert_eq!(a.cache().len(), 20);
        assert_eq!(b.cache().len(), 20);

        a.reset(t0 + DEBOUNCE);
        assert!(a.cache().is_empty());
        assert_eq!(b.cache().len(), 20);
        assert_eq!(b.watermark(), 20);
    }

    #[test]
    fn test_repeated_target_requests_once() {
        let tokenizer = Arc::new(WordTokenizer::default());
        let spawner = Arc::new(InlineSpawner::new(tokenizer.clone()));
        let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let lines = numbered(50);
        let t0 = Instant::now();

        assert!(scheduler.request_through(40, t0));
        assert!(!scheduler.request_through(40, t0));
        scheduler.tick(&lines, t0 + DEBOUNCE);
        assert!(!scheduler.request_through(40, t0 + DEBOUNCE));
        scheduler.tick(&lines, t0 + DEBOUNCE * 4);

        assert_eq!(tokenizer.calls.lock().unwrap().len(), 1);
        assert_eq!(scheduler.metrics().requests, 1);
    }

    #[test]
    fn test_append_only_tokenizes_new_lines() {
        let tokenizer = Arc::new(WordTokenizer::default());
        let spawner = Arc::new(InlineSpawner::new(tokenizer.clone()));
        let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let mut store = LineStore::from_text(&numbered(10).join("\n"));
        let t0 = Instant::now();

        scheduler.on_rows(0..10, t0);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        assert_eq!(scheduler.watermark(), 10);

        let more: String = (10..60).map(|i| format!("\nline {i}")).collect();
        let change = store.append(&more);
        assert_eq!(change.first_changed_line, 10);
        let t1 = t0 + Duration::from_secs(1);
        scheduler.on_source_change(&change, t1);
        scheduler.on_rows(0..60, t1);
        scheduler.tick(store.lines(), t1 + DEBOUNCE);

        let calls = tokenizer.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0.first().map(String::as_str), Some("line 10"));
        assert_eq!(calls[1].0.len(), 50);
        assert_eq!(scheduler.watermark(), 60);
    }

    #[test]
    fn test_partial_line_append_rehighlights_tail() {
        let spawner = Arc::new(InlineSpawner::new(Arc::new(WordTokenizer::default())));
        let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let mut store = LineStore::from_text("a b\nc");
        let t0 = Instant::now();

        scheduler.on_rows(0..2, t0);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        assert_eq!(scheduler.watermark(), 2);

        let change = store.append(" d");
        scheduler.on_source_change(&change, t0 + DEBOUNCE);
        assert_eq!(scheduler.watermark(), 1);
        assert!(scheduler.token_line(1).is_none());

        scheduler.tick(store.lines(), t0 + DEBOUNCE * 2);
        assert_eq!(scheduler.token_line(1).map(TokenLine::text), Some("c d".to_string()));
        assert_eq!(scheduler.watermark(), 2);
    }

    #[test]
    fn test_line_changed_in_flight_is_retried() {
        let (spawner, mut scheduler) = manual();
        let tokenizer = WordTokenizer::default();
        let mut store = LineStore::from_text("a\nb");
        let t0 = Instant::now();

        scheduler.on_rows(0..2, t0);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        let change = store.append("c");
        scheduler.on_source_change(&change, t0 + DEBOUNCE);

        spawner.complete_all(&tokenizer);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        assert!(scheduler.token_line(0).is_some());
        assert!(scheduler.token_line(1).is_none());
        assert_eq!(scheduler.watermark(), 1);

        // The capped line is requested again.
        scheduler.tick(store.lines(), t0 + DEBOUNCE * 3);
        assert_eq!(spawner.requests().last().map(|r| r.2.clone()), Some(1..2));
    }

    #[test]
    fn test_replace_resets() {
        let spawner = Arc::new(InlineSpawner::new(Arc::new(WordTokenizer::default())));
        let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let mut store = LineStore::from_text("one\ntwo\nthree");
        let t0 = Instant::now();

        scheduler.on_rows(0..3, t0);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        assert_eq!(scheduler.cache().len(), 3);
        let epoch = scheduler.epoch();

        let change = store.apply("uno\ndos\ntres");
        assert!(change.is_identity_change());
        scheduler.reset(t0 + DEBOUNCE);
        assert_eq!(scheduler.watermark(), 0);
        assert!(scheduler.cache().is_empty());
        assert!(scheduler.epoch() > epoch);

        scheduler.tick(store.lines(), t0 + DEBOUNCE * 2);
        assert_eq!(scheduler.token_line(0).map(TokenLine::text), Some("uno".to_string()));
    }

    #[test]
    fn test_result_in_flight_across_reset_is_dropped() {
        let (spawner, mut scheduler) = manual();
        let tokenizer = WordTokenizer::default();
        let mut store = LineStore::from_text("one\ntwo");
        let t0 = Instant::now();

        scheduler.on_rows(0..2, t0);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        store.apply("uno\ndos");
        scheduler.reset(t0 + DEBOUNCE);

        spawner.complete(0, &tokenizer);
        scheduler.tick(store.lines(), t0 + DEBOUNCE);
        assert!(scheduler.cache().is_empty());
        assert_eq!(scheduler.metrics().stale_discards, 1);
    }

    #[test]
    fn test_tokenizer_error_leaves_lines_unstyled() {
        let tokenizer = Arc::new(WordTokenizer::default());
        tokenizer.fail.store(true, Ordering::Relaxed);
        let spawner = Arc::new(InlineSpawner::new(tokenizer.clone()));
        let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
        let lines = numbered(30);
        let t0 = Instant::now();

        scheduler.on_rows(0..30, t0);
        let outcome = scheduler.tick(&lines, t0 + DEBOUNCE);
        assert!(outcome.updated.is_empty());
        assert_eq!(scheduler.watermark(), 30);
        assert!(scheduler.cache().is_empty());
        assert_eq!(scheduler.metrics().failures, 1);

        // No retry storm.
        scheduler.on_rows(0..30, t0 + DEBOUNCE);
        scheduler.tick(&lines, t0 + DEBOUNCE * 5);
        assert_eq!(tokenizer.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_set_language_resets() {
        let (spawner, mut scheduler) = manual();
        let lines = numbered(5);
        let t0 = Instant::now();

        scheduler.on_rows(0..5, t0);
        scheduler.tick(&lines, t0 + DEBOUNCE);
        scheduler.set_language("rust", t0 + DEBOUNCE);
        assert_eq!(scheduler.language(), "rust");
        scheduler.tick(&lines, t0 + DEBOUNCE * 2);

        let requests = spawner.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].1 > requests[0].1);
        assert_eq!(requests[1].2, 0..5);
    }

    proptest! {
        #[test]
        fn watermark_never_decreases(
            events in proptest::collection::vec((0usize..3, 0usize..40, 0u64..500), 1..40)
        ) {
            let spawner = Arc::new(InlineSpawner::new(Arc::new(WordTokenizer::default())));
            let mut scheduler = HighlightScheduler::new(CallerId::next(), "text", spawner, DEBOUNCE);
            let mut store = LineStore::from_text(&numbered(20).join("\n"));
            let mut now = Instant::now();
            let mut last = 0;

            for (kind, n, advance) in events {
                now += Duration::from_millis(advance);
                match kind {
                    0 => {
                        let end = n.min(store.len());
                        scheduler.on_rows(end.saturating_sub(10)..end, now);
                    }
                    1 => {
                        let more: String = (0..n % 5).map(|i| format!("\nextra {i}")).collect();
                        let change = store.append(&more);
                        scheduler.on_source_change(&change, now);
                    }
                    _ => {}
                }
                scheduler.tick(store.lines(), now);
                prop_assert!(scheduler.watermark() >= last);
                last = scheduler.watermark();
            }
        }
    }
}
