// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Host configuration for code previews.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::view::Px;

/// Height past which a collapsible preview is clamped.
pub const DEFAULT_COLLAPSE_THRESHOLD: Px = 350;

/// Extra rows rendered beyond each edge of the visible range.
pub const DEFAULT_OVERSCAN: usize = 20;

/// Trailing delay applied to highlight requests.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Display and scheduling settings for a [`CodePreview`](crate::view::CodePreview).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// Whether the line-number gutter is shown.
    pub show_line_numbers: bool,
    /// Whether long lines may wrap. The user can still turn wrapping off.
    pub wrappable: bool,
    /// Whether tall previews are collapsed. The user can still expand them.
    pub collapsible: bool,
    /// Maximum container height while collapsed.
    pub collapse_threshold: Px,
    /// Font size in pixels; code renders one pixel smaller.
    pub font_size: u32,
    pub overscan: usize,
    pub debounce_ms: u64,
    /// Threads in the shared tokenizer pool.
    pub worker_threads: usize,
    pub tab_width: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            wrappable: false,
            collapsible: false,
            collapse_threshold: DEFAULT_COLLAPSE_THRESHOLD,
            font_size: 14,
            overscan: DEFAULT_OVERSCAN,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            worker_threads: 2,
            tab_width: 4,
        }
    }
}

impl ViewConfig {
    /// Parses and validates a config from TOML source.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.font_size < 2 {
            return Err(ConfigError::Invalid {
                field: "font_size",
                reason: format!("must be at least 2, got {}", self.font_size),
            });
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_threads",
                reason: "at least one worker thread is required".to_string(),
            });
        }
        if self.collapse_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "collapse_threshold",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Row height estimate for the configured font size.
    pub fn estimate_line_height(&self) -> Px {
        estimate_line_height(self.font_size)
    }
}

/// Estimates a row's height from the font size.
///
/// Code renders at `font_size - 1` with a 1.6 line height, rounded to whole
/// pixels so estimates and measurements agree.
pub fn estimate_line_height(font_size: u32) -> Px {
    let code_size = font_size.saturating_sub(1) as f32;
    (code_size * 1.6).round() as Px
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ViewConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewConfig::default());
        assert_eq!(config.collapse_threshold, 350);
        assert_eq!(config.overscan, 20);
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_document() {
        let config = ViewConfig::from_toml_str(
            "show_line_numbers = true\nfont_size = 16\ncollapsible = true\n",
        )
        .unwrap();
        assert!(config.show_line_numbers);
        assert!(config.collapsible);
        assert_eq!(config.font_size, 16);
        assert!(!config.wrappable);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ViewConfig::from_toml_str("line_height = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values() {
        let err = ViewConfig::from_toml_str("worker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "worker_threads", .. }));

        let err = ViewConfig::from_toml_str("font_size = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "font_size", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ViewConfig::load("/nonexistent/codeview.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_estimate_line_height() {
        assert_eq!(estimate_line_height(14), 21);
        assert_eq!(estimate_line_height(16), 24);
        assert_eq!(estimate_line_height(11), 16);
        assert_eq!(ViewConfig::default().estimate_line_height(), 21);
    }
}
