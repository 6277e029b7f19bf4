// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Virtualized presentation of a code block.

pub mod code_preview;
pub mod compositor;
pub mod toolbar;
pub mod virtualizer;

pub use code_preview::CodePreview;
pub use compositor::{Gutter, HighlightState, RenderedRow, RenderedSpan, RowState, SizeState, render_row};
pub use toolbar::{SharedToolRegistry, Tool, ToolId, ToolRegistry, Toolbar};
pub use virtualizer::{Px, RowKey, VirtualRow, Virtualizer};
