// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Toolbar registration side channel.
//!
//! A preview announces the tools it currently offers to a host-owned
//! [`ToolRegistry`]; the host draws them and calls back into the preview
//! when one is activated.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::highlight::CallerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    Expand,
    Wrap,
}

impl ToolId {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::Expand => "expand",
            ToolId::Wrap => "wrap",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A toolbar entry as the host should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub id: ToolId,
    /// Localization key of the label.
    pub label_key: &'static str,
    pub active: bool,
    /// Sort position among the caller's tools.
    pub order: u32,
}

/// Receives tool registrations from previews.
pub trait ToolRegistry {
    /// Adds or replaces `tool` for `caller`.
    fn register(&mut self, caller: CallerId, tool: Tool);

    fn remove(&mut self, caller: CallerId, id: ToolId);
}

pub type SharedToolRegistry = Arc<Mutex<dyn ToolRegistry + Send>>;

/// In-memory registry holding every caller's tools.
#[derive(Debug, Default)]
pub struct Toolbar {
    tools: BTreeMap<(CallerId, ToolId), Tool>,
}

impl Toolbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Tools of `caller`, in display order.
    pub fn tools_for(&self, caller: CallerId) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self
            .tools
            .range((caller, ToolId::Expand)..=(caller, ToolId::Wrap))
            .map(|(_, tool)| tool)
            .collect();
        tools.sort_by_key(|tool| tool.order);
        tools
    }

    pub fn get(&self, caller: CallerId, id: ToolId) -> Option<&Tool> {
        self.tools.get(&(caller, id))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for Toolbar {
    fn register(&mut self, caller: CallerId, tool: Tool) {
        self.tools.insert((caller, tool.id), tool);
    }

    fn remove(&mut self, caller: CallerId, id: ToolId) {
        self.tools.remove(&(caller, id));
    }
}
