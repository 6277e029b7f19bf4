// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Source text storage and change classification.

pub mod line_store;
pub mod source_change;

pub use line_store::{LineStore, split};
pub use source_change::{ChangeKind, SourceChange, classify};
