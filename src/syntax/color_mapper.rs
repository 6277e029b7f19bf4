// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Maps token scopes to terminal colors.
//!
//! The compositor asks a [`StyleResolver`] how to paint each token and the
//! scroll container. [`ColorMapper`] is the built-in resolver: a scope to
//! [`IndexedColor`] table with dark and light palettes in 256 and 16 color
//! variants.

use std::collections::HashMap;

use crate::syntax::token::Token;

/// The 16 standard terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl IndexedColor {
    /// SGR parameter selecting this color as the foreground.
    pub fn fg_code(self) -> u8 {
        match self {
            IndexedColor::Black => 30,
            IndexedColor::Red => 31,
            IndexedColor::Green => 32,
            IndexedColor::Yellow => 33,
            IndexedColor::Blue => 34,
            IndexedColor::Magenta => 35,
            IndexedColor::Cyan => 36,
            IndexedColor::White => 37,
            IndexedColor::BrightBlack => 90,
            IndexedColor::BrightRed => 91,
            IndexedColor::BrightGreen => 92,
            IndexedColor::BrightYellow => 93,
            IndexedColor::BrightBlue => 94,
            IndexedColor::BrightMagenta => 95,
            IndexedColor::BrightCyan => 96,
            IndexedColor::BrightWhite => 97,
        }
    }

    /// SGR parameter selecting this color as the background.
    pub fn bg_code(self) -> u8 {
        self.fg_code() + 10
    }
}

/// How one span of text is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    /// `None` keeps the frame's foreground.
    pub fg: Option<IndexedColor>,
    pub bold: bool,
    pub italic: bool,
    /// De-emphasized, used for text that has not been highlighted yet.
    pub dimmed: bool,
}

impl Style {
    pub fn fg(color: IndexedColor) -> Self {
        Self {
            fg: Some(color),
            ..Self::default()
        }
    }

    pub fn dimmed() -> Self {
        Self {
            dimmed: true,
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// SGR escape that switches to this style, or an empty string for the
    /// plain style.
    pub fn ansi_prefix(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        if self.bold {
            params.push("1".to_string());
        }
        if self.dimmed {
            params.push("2".to_string());
        }
        if self.italic {
            params.push("3".to_string());
        }
        if let Some(fg) = self.fg {
            params.push(fg.fg_code().to_string());
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", params.join(";"))
        }
    }
}

/// Colors of the scroll container itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    pub fg: IndexedColor,
    pub bg: IndexedColor,
    pub dark: bool,
}

impl FrameStyle {
    /// Class name hosts attach to the container.
    pub fn class_name(&self) -> &'static str {
        if self.dark { "code-dark" } else { "code-light" }
    }
}

/// Supplies the visual style for tokens and the container.
pub trait StyleResolver: Send + Sync {
    fn style_for(&self, token: &Token) -> Style;

    fn frame(&self) -> FrameStyle;
}

/// Maps token scopes to colors for syntax highlighting.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    /// Mapping from token scope to color
    token_colors: HashMap<String, IndexedColor>,
    /// Whether to use 256-color mode (vs 16-color mode)
    use_256_colors: bool,
    dark: bool,
}

impl Default for ColorMapper {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ColorMapper {
    /// Creates a color mapper with the default dark theme.
    pub fn new(use_256_colors: bool) -> Self {
        let mut mapper = Self {
            token_colors: HashMap::new(),
            use_256_colors,
            dark: true,
        };
        mapper.load_default_theme();
        mapper
    }

    /// Creates a color mapper with the default light theme.
    pub fn light(use_256_colors: bool) -> Self {
        let mut mapper = Self {
            token_colors: HashMap::new(),
            use_256_colors,
            dark: false,
        };
        mapper.load_default_theme();
        mapper
    }

    fn load_default_theme(&mut self) {
        use IndexedColor::*;

        let palette: &[(&str, IndexedColor)] = match (self.dark, self.use_256_colors) {
            (true, true) => &[
                ("keyword", Blue),
                ("type", Cyan),
                ("string", Green),
                ("comment", BrightBlack),
                ("number", Magenta),
                ("boolean", Magenta),
                ("attribute", Yellow),
                ("builtin", BrightCyan),
                ("decorator", BrightYellow),
                ("regex", Red),
                ("operator", White),
                ("punctuation", BrightBlack),
                ("function", BrightBlue),
                ("variable", White),
                ("constant", BrightMagenta),
                ("error", BrightRed),
            ],
            (true, false) => &[
                ("keyword", Blue),
                ("type", Cyan),
                ("string", Green),
                ("comment", BrightBlack),
                ("number", Yellow),
                ("boolean", Yellow),
                ("attribute", Yellow),
                ("builtin", Cyan),
                ("decorator", Yellow),
                ("regex", Red),
                ("operator", White),
                ("punctuation", White),
                ("function", Blue),
                ("variable", White),
                ("constant", Yellow),
                ("error", Red),
            ],
            (false, true) => &[
                ("keyword", Blue),
                ("type", Cyan),
                ("string", Green),
                ("comment", BrightBlack),
                ("number", Magenta),
                ("boolean", Magenta),
                ("attribute", Red),
                ("builtin", Cyan),
                ("decorator", Magenta),
                ("regex", Red),
                ("operator", Black),
                ("punctuation", BrightBlack),
                ("function", Blue),
                ("variable", Black),
                ("constant", Magenta),
                ("error", Red),
            ],
            (false, false) => &[
                ("keyword", Blue),
                ("type", Cyan),
                ("string", Green),
                ("comment", BrightBlack),
                ("number", Magenta),
                ("boolean", Magenta),
                ("attribute", Red),
                ("builtin", Cyan),
                ("decorator", Magenta),
                ("regex", Red),
                ("operator", Black),
                ("punctuation", Black),
                ("function", Blue),
                ("variable", Black),
                ("constant", Magenta),
                ("error", Red),
            ],
        };

        self.token_colors = palette
            .iter()
            .map(|&(scope, color)| (scope.to_string(), color))
            .collect();
    }

    /// Gets the color for a given scope, or `None` for unknown scopes.
    pub fn get_color(&self, scope: &str) -> Option<IndexedColor> {
        self.token_colors.get(scope).copied()
    }

    /// Sets a custom color for a scope.
    pub fn set_color(&mut self, scope: impl Into<String>, color: IndexedColor) {
        self.token_colors.insert(scope.into(), color);
    }

    /// Resets the color mapping to the default theme.
    pub fn reset_to_default(&mut self) {
        self.load_default_theme();
    }

    pub fn is_256_color_mode(&self) -> bool {
        self.use_256_colors
    }

    /// Switches color depth. Custom colors are dropped.
    pub fn set_256_color_mode(&mut self, use_256_colors: bool) {
        if self.use_256_colors != use_256_colors {
            self.use_256_colors = use_256_colors;
            self.reset_to_default();
        }
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// Switches between the dark and light palettes. Custom colors are dropped.
    pub fn set_dark(&mut self, dark: bool) {
        if self.dark != dark {
            self.dark = dark;
            self.reset_to_default();
        }
    }

    /// Replaces the whole scope table.
    pub fn load_theme(&mut self, theme: HashMap<String, IndexedColor>) {
        self.token_colors = theme;
    }

    pub fn export_theme(&self) -> HashMap<String, IndexedColor> {
        self.token_colors.clone()
    }
}

impl StyleResolver for ColorMapper {
    fn style_for(&self, token: &Token) -> Style {
        let Some(scope) = token.scope.as_deref() else {
            return Style::default();
        };
        // Dotted scopes such as `string.escape` fall back to their head.
        let color = self
            .get_color(scope)
            .or_else(|| scope.split('.').next().and_then(|head| self.get_color(head)));
        Style {
            fg: color,
            italic: scope == "comment",
            ..Style::default()
        }
    }

    fn frame(&self) -> FrameStyle {
        if self.dark {
            FrameStyle {
                fg: IndexedColor::White,
                bg: IndexedColor::Black,
                dark: true,
            }
        } else {
            FrameStyle {
                fg: IndexedColor::Black,
                bg: IndexedColor::BrightWhite,
                dark: false,
            }
        }
    }
}
