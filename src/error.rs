// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types shared across the crate.
//!
//! None of these are fatal to a host: a failed tokenization only leaves lines
//! unstyled, and rendering never returns an error.

use thiserror::Error;

/// Errors produced by a [`Tokenizer`](crate::syntax::Tokenizer) or by the
/// machinery that runs it.
#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("failed to initialize grammar for {language}: {reason}")]
    Grammar { language: String, reason: String },

    #[error("tokenizer returned {got} token lines for {expected} input lines")]
    LengthMismatch { expected: usize, got: usize },

    #[error("tokenizer worker pool is shut down")]
    WorkerGone,

    #[error("tokenizer failed: {0}")]
    Failed(String),
}

/// Errors that can occur while loading a [`ViewConfig`](crate::config::ViewConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
