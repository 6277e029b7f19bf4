// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lexical tokenization and styling.
//!
//! This module turns lines of source into scoped tokens using synoptic, and
//! maps those scopes onto terminal styles.

pub mod color_mapper;
pub mod language;
pub mod metrics;
pub mod token;
pub mod tokenizer;

mod performance_test;

pub use color_mapper::{ColorMapper, FrameStyle, IndexedColor, Style, StyleResolver};
pub use language::{Language, LanguageConfig, LanguageRegistry};
pub use metrics::HighlightMetrics;
pub use token::{Token, TokenLine};
pub use tokenizer::{SynopticTokenizer, Tokenizer};
