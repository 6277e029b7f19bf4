// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Incremental, viewport-driven syntax highlighting for long and still-growing
//! code blocks.
//!
//! A [`CodePreview`] owns one code block. Text flows through the
//! [`LineStore`], the [`Virtualizer`] picks the rows worth rendering, the
//! [`HighlightScheduler`] tokenizes just enough lines to cover them on a
//! [`WorkerPool`], and the compositor renders each row from whatever has been
//! committed so far.

pub mod buffer;
pub mod config;
pub mod error;
pub mod highlight;
pub mod syntax;
pub mod view;

pub use buffer::{LineStore, SourceChange};
pub use config::ViewConfig;
pub use error::{ConfigError, TokenizeError};
pub use highlight::{CallerId, HighlightScheduler, InlineSpawner, Spawner, WorkerPool};
pub use syntax::{ColorMapper, Language, StyleResolver, SynopticTokenizer, Token, TokenLine, Tokenizer};
pub use view::{CodePreview, Px, RenderedRow, Toolbar, VirtualRow, Virtualizer};
