// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A scrollable, incrementally highlighted code block.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};
use std::time::Instant;

use crate::buffer::{ChangeKind, LineStore, SourceChange};
use crate::config::ViewConfig;
use crate::error::ConfigError;
use crate::highlight::{CallerId, HighlightScheduler, Spawner, TickOutcome};
use crate::syntax::{FrameStyle, HighlightMetrics, StyleResolver};
use crate::view::compositor::{Gutter, HighlightState, RenderedRow, RowState, SizeState, render_row};
use crate::view::toolbar::{SharedToolRegistry, Tool, ToolId};
use crate::view::{Px, Virtualizer};

const DEFAULT_LANGUAGE: &str = "text";

/// One code block: its text, geometry, highlighting and toolbar state.
///
/// All methods run on the host's UI thread. Tokenization happens on the
/// [`Spawner`]; results are picked up by [`tick`](CodePreview::tick).
pub struct CodePreview {
    caller: CallerId,
    config: ViewConfig,
    store: LineStore,
    language: String,
    virtualizer: Virtualizer,
    scheduler: HighlightScheduler,
    resolver: Arc<dyn StyleResolver>,
    toolbar: Option<SharedToolRegistry>,
    registered: BTreeMap<ToolId, Tool>,
    /// User asked to see the whole block despite `collapsible`.
    expand_override: bool,
    /// User turned wrapping off despite `wrappable`.
    unwrap_override: bool,
    host_height: Px,
}

impl CodePreview {
    pub fn new(config: ViewConfig, spawner: Arc<dyn Spawner>, resolver: Arc<dyn StyleResolver>) -> Self {
        let caller = CallerId::next();
        let store = LineStore::new();
        let virtualizer = Virtualizer::new(caller, store.len(), config.estimate_line_height(), config.overscan);
        let scheduler = HighlightScheduler::new(caller, DEFAULT_LANGUAGE, spawner, config.debounce());

        tracing::debug!(%caller, "code preview created");
        Self {
            caller,
            expand_override: !config.collapsible,
            unwrap_override: !config.wrappable,
            config,
            store,
            language: DEFAULT_LANGUAGE.to_string(),
            virtualizer,
            scheduler,
            resolver,
            toolbar: None,
            registered: BTreeMap::new(),
            host_height: 0,
        }
    }

    /// Connects the preview to a host toolbar.
    pub fn with_toolbar(mut self, registry: SharedToolRegistry) -> Self {
        self.toolbar = Some(registry);
        self.sync_tools();
        self
    }

    pub fn caller(&self) -> CallerId {
        self.caller
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn lines(&self) -> &[String] {
        self.store.lines()
    }

    pub fn line_count(&self) -> usize {
        self.store.len()
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn scheduler(&self) -> &HighlightScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &HighlightMetrics {
        self.scheduler.metrics()
    }

    /// When [`tick`](CodePreview::tick) next has work, if a request is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn frame(&self) -> FrameStyle {
        self.resolver.frame()
    }

    /// Sets the full source text, typically the message streamed so far.
    ///
    /// A different `language` is a new identity even if the text is unchanged.
    pub fn set_source(&mut self, text: &str, language: &str, now: Instant) -> SourceChange {
        let change = self.store.apply(text);
        if language == self.language {
            self.on_change(&change, now);
            return change;
        }

        tracing::debug!(caller = %self.caller, from = %self.language, to = language, "language changed");
        self.language = language.to_string();
        self.virtualizer.reset();
        self.virtualizer.set_count(self.store.len());
        self.scheduler.set_language(language, now);
        self.refresh(now);
        SourceChange::replace(change.line_delta)
    }

    /// Appends a streamed chunk to the source text.
    pub fn append(&mut self, chunk: &str, now: Instant) -> SourceChange {
        let change = self.store.append(chunk);
        self.on_change(&change, now);
        change
    }

    pub fn scroll_to(&mut self, offset: Px, now: Instant) {
        self.virtualizer.scroll_to_offset(offset);
        self.refresh(now);
    }

    /// Sets the height the host makes available to the block.
    pub fn resize(&mut self, height: Px, now: Instant) {
        self.host_height = height;
        self.apply_viewport();
        self.refresh(now);
    }

    /// Records the rendered height of a row. Returns the scroll adjustment
    /// the host must apply to keep its content in place.
    pub fn measure(&mut self, index: usize, size: Px, now: Instant) -> i64 {
        let delta = self.virtualizer.measure(index, size);
        self.refresh(now);
        delta
    }

    /// Fires due highlight requests and commits finished ones.
    ///
    /// `updated` in the outcome lists the rendered rows that need repainting.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.scheduler.tick(self.store.lines(), now)
    }

    /// Renders every row in the current window.
    pub fn rows(&mut self) -> Vec<RenderedRow> {
        let gutter = if self.config.show_line_numbers {
            Gutter::for_line_count(self.store.len())
        } else {
            Gutter::hidden()
        };

        let mut hits = 0;
        let rows: Vec<RenderedRow> = self
            .virtualizer
            .rows()
            .iter()
            .map(|row| {
                let line = self.store.line(row.index).unwrap_or_default();
                let tokens = self.scheduler.token_line(row.index);
                hits += usize::from(tokens.is_some());
                render_row(row, line, tokens, self.resolver.as_ref(), &gutter)
            })
            .collect();

        let metrics = self.scheduler.metrics_mut();
        for _ in 0..hits {
            metrics.record_cache_hit();
        }
        for _ in hits..rows.len() {
            metrics.record_cache_miss();
        }
        rows
    }

    pub fn row_state(&self, index: usize) -> Option<RowState> {
        if index >= self.store.len() {
            return None;
        }
        Some(RowState {
            size: if self.virtualizer.is_measured(index) {
                SizeState::Measured
            } else {
                SizeState::Estimated
            },
            highlight: if self.scheduler.token_line(index).is_some() {
                HighlightState::Highlighted
            } else {
                HighlightState::Unhighlighted
            },
        })
    }

    pub fn is_collapsed(&self) -> bool {
        self.config.collapsible && !self.expand_override
    }

    pub fn is_wrapped(&self) -> bool {
        self.config.wrappable && !self.unwrap_override
    }

    /// Height cap of the container, if collapsed.
    pub fn max_height(&self) -> Option<Px> {
        self.is_collapsed().then_some(self.config.collapse_threshold)
    }

    /// Height of the scroll container after collapsing.
    pub fn container_height(&self) -> Px {
        match self.max_height() {
            Some(max) => self.host_height.min(max),
            None => self.host_height,
        }
    }

    pub fn total_size(&self) -> Px {
        self.virtualizer.total_size()
    }

    /// Applies new host settings. A changed flag resets the matching user
    /// override.
    pub fn set_config(&mut self, config: ViewConfig, now: Instant) -> Result<(), ConfigError> {
        config.validate()?;
        let was_wrapped = self.is_wrapped();
        let old = std::mem::replace(&mut self.config, config);

        if old.collapsible != self.config.collapsible {
            self.expand_override = !self.config.collapsible;
        }
        if old.wrappable != self.config.wrappable {
            self.unwrap_override = !self.config.wrappable;
        }
        if was_wrapped != self.is_wrapped() {
            self.virtualizer.reset();
        }
        self.virtualizer.set_estimate(self.config.estimate_line_height());
        self.virtualizer.set_overscan(self.config.overscan);
        self.scheduler.set_debounce(self.config.debounce());

        self.apply_viewport();
        self.refresh(now);
        Ok(())
    }

    pub fn set_font_size(&mut self, font_size: u32, now: Instant) -> Result<(), ConfigError> {
        let config = ViewConfig {
            font_size,
            ..self.config.clone()
        };
        self.set_config(config, now)
    }

    /// Tools currently offered to the host, in display order.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        if self.config.collapsible && self.virtualizer.total_size() > self.config.collapse_threshold {
            tools.push(Tool {
                id: ToolId::Expand,
                label_key: if self.expand_override {
                    "code_block.collapse"
                } else {
                    "code_block.expand"
                },
                active: self.expand_override,
                order: 0,
            });
        }
        if self.config.wrappable {
            tools.push(Tool {
                id: ToolId::Wrap,
                label_key: if self.unwrap_override {
                    "code_block.wrap.on"
                } else {
                    "code_block.wrap.off"
                },
                active: self.is_wrapped(),
                order: 1,
            });
        }
        tools
    }

    /// Handles a click on one of this preview's tools.
    pub fn activate_tool(&mut self, id: ToolId, now: Instant) {
        match id {
            ToolId::Expand => {
                self.expand_override = !self.expand_override;
                self.apply_viewport();
            }
            ToolId::Wrap => {
                self.unwrap_override = !self.unwrap_override;
                // Wrapped heights no longer apply.
                self.virtualizer.reset();
            }
        }
        tracing::debug!(caller = %self.caller, tool = %id, "tool activated");
        self.refresh(now);
    }

    fn on_change(&mut self, change: &SourceChange, now: Instant) {
        match change.kind {
            ChangeKind::Unchanged => return,
            ChangeKind::Replace => self.virtualizer.reset(),
            ChangeKind::Append => self.virtualizer.forget_from(change.first_changed_line),
        }
        self.virtualizer.set_count(self.store.len());
        self.scheduler.on_source_change(change, now);
        self.refresh(now);
    }

    fn apply_viewport(&mut self) {
        let height = self.container_height();
        self.virtualizer.set_viewport_height(height);
    }

    fn refresh(&mut self, now: Instant) {
        let rows = self.virtualizer.range();
        self.scheduler.on_rows(rows, now);
        self.sync_tools();
    }

    fn sync_tools(&mut self) {
        let Some(toolbar) = &self.toolbar else {
            return;
        };
        let wanted: BTreeMap<ToolId, Tool> = self.tools().into_iter().map(|tool| (tool.id, tool)).collect();
        if wanted == self.registered {
            return;
        }

        let mut registry = toolbar.lock().unwrap_or_else(PoisonError::into_inner);
        for id in self.registered.keys() {
            if !wanted.contains_key(id) {
                registry.remove(self.caller, *id);
            }
        }
        for (id, tool) in &wanted {
            if self.registered.get(id) != Some(tool) {
                registry.register(self.caller, tool.clone());
            }
        }
        drop(registry);
        self.registered = wanted;
    }
}

impl Drop for CodePreview {
    fn drop(&mut self) {
        if let Some(toolbar) = &self.toolbar {
            let mut registry = toolbar.lock().unwrap_or_else(PoisonError::into_inner);
            for id in self.registered.keys() {
                registry.remove(self.caller, *id);
            }
        }
        tracing::trace!(caller = %self.caller, "code preview dropped");
    }
}

impl std::fmt::Debug for CodePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodePreview")
            .field("caller", &self.caller)
            .field("language", &self.language)
            .field("lines", &self.store.len())
            .field("collapsed", &self.is_collapsed())
            .field("wrapped", &self.is_wrapped())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
