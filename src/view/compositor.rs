// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turns virtual rows into styled output.

use crate::syntax::{Style, StyleResolver, TokenLine};
use crate::view::{Px, RowKey, VirtualRow};

/// Line-number column shared by every row of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gutter {
    width: usize,
}

impl Gutter {
    /// Sizes the gutter for the largest number shown, `line_count`.
    pub fn for_line_count(line_count: usize) -> Self {
        let mut width = 1;
        let mut n = line_count;
        while n >= 10 {
            n /= 10;
            width += 1;
        }
        Self { width }
    }

    pub fn hidden() -> Self {
        Self { width: 0 }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_hidden(&self) -> bool {
        self.width == 0
    }

    /// Right-aligned, 1-based label for line `index`.
    pub fn label(&self, index: usize) -> Option<String> {
        if self.is_hidden() {
            None
        } else {
            Some(format!("{:>width$}", index + 1, width = self.width))
        }
    }
}

/// A run of text painted in one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSpan {
    pub text: String,
    pub style: Style,
}

/// One row ready for the host to paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub index: usize,
    pub key: RowKey,
    pub start: Px,
    pub size: Px,
    pub gutter: Option<String>,
    pub spans: Vec<RenderedSpan>,
    pub highlighted: bool,
}

impl RenderedRow {
    /// Concatenated span text, without the gutter.
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Renders the row for a terminal using SGR escapes.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        if let Some(gutter) = &self.gutter {
            out.push_str("\x1b[2m");
            out.push_str(gutter);
            out.push_str("\x1b[0m ");
        }
        for span in &self.spans {
            let prefix = span.style.ansi_prefix();
            if prefix.is_empty() {
                out.push_str(&span.text);
            } else {
                out.push_str(&prefix);
                out.push_str(&span.text);
                out.push_str("\x1b[0m");
            }
        }
        out
    }
}

/// Renders `row` from its raw `line` and, if committed, its token line.
pub fn render_row(
    row: &VirtualRow,
    line: &str,
    tokens: Option<&TokenLine>,
    resolver: &dyn StyleResolver,
    gutter: &Gutter,
) -> RenderedRow {
    let (spans, highlighted) = match tokens {
        Some(token_line) if !token_line.is_empty() => (
            token_line
                .tokens()
                .iter()
                .map(|token| RenderedSpan {
                    text: token.content.clone(),
                    style: resolver.style_for(token),
                })
                .collect(),
            true,
        ),
        // Keep blank rows from collapsing to zero height.
        Some(_) => (vec![plain_span(" ", Style::default())], true),
        None if line.is_empty() => (vec![plain_span(" ", Style::dimmed())], false),
        None => (vec![plain_span(line, Style::dimmed())], false),
    };

    RenderedRow {
        index: row.index,
        key: row.key,
        start: row.start,
        size: row.size,
        gutter: gutter.label(row.index),
        spans,
        highlighted,
    }
}

fn plain_span(text: &str, style: Style) -> RenderedSpan {
    RenderedSpan {
        text: text.to_string(),
        style,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeState {
    Estimated,
    Measured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    Unhighlighted,
    Highlighted,
}

/// Where a row stands on its two independent axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    pub size: SizeState,
    pub highlight: HighlightState,
}

impl RowState {
    pub fn is_settled(&self) -> bool {
        self.size == SizeState::Measured && self.highlight == HighlightState::Highlighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::CallerId;
    use crate::syntax::{ColorMapper, IndexedColor, Token};

    fn row(index: usize) -> VirtualRow {
        VirtualRow {
            index,
            key: RowKey {
                caller: CallerId::next(),
                index,
            },
            start: index as Px * 21,
            size: 21,
        }
    }

    #[test]
    fn test_gutter_width() {
        assert_eq!(Gutter::for_line_count(0).width(), 1);
        assert_eq!(Gutter::for_line_count(9).width(), 1);
        assert_eq!(Gutter::for_line_count(10).width(), 2);
        assert_eq!(Gutter::for_line_count(500).width(), 3);

        let gutter = Gutter::for_line_count(120);
        assert_eq!(gutter.label(0).as_deref(), Some("  1"));
        assert_eq!(gutter.label(119).as_deref(), Some("120"));
        assert_eq!(Gutter::hidden().label(3), None);
    }

    #[test]
    fn test_highlighted_row() {
        let mapper = ColorMapper::new(true);
        let tokens = TokenLine::new(vec![
            Token::scoped("let", "keyword"),
            Token::plain(" x = "),
            Token::scoped("1", "number"),
        ]);
        let rendered = render_row(&row(4), "let x = 1", Some(&tokens), &mapper, &Gutter::hidden());

        assert!(rendered.highlighted);
        assert_eq!(rendered.text(), "let x = 1");
        assert_eq!(rendered.spans.len(), 3);
        assert_eq!(rendered.spans[0].style.fg, Some(IndexedColor::Blue));
        assert!(rendered.spans[1].style.is_plain());
        assert_eq!(rendered.start, 84);
    }

    #[test]
    fn test_raw_row_is_dimmed() {
        let mapper = ColorMapper::new(true);
        let rendered = render_row(&row(0), "fn main()", None, &mapper, &Gutter::for_line_count(3));

        assert!(!rendered.highlighted);
        assert_eq!(rendered.text(), "fn main()");
        assert!(rendered.spans[0].style.dimmed);
        assert_eq!(rendered.gutter.as_deref(), Some("1"));
        assert_eq!(rendered.to_ansi(), "\x1b[2m1\x1b[0m \x1b[2mfn main()\x1b[0m");
    }

    #[test]
    fn test_empty_lines_render_a_space() {
        let mapper = ColorMapper::new(true);
        let raw = render_row(&row(0), "", None, &mapper, &Gutter::hidden());
        assert_eq!(raw.text(), " ");

        let highlighted = render_row(&row(0), "", Some(&TokenLine::plain("")), &mapper, &Gutter::hidden());
        assert_eq!(highlighted.text(), " ");
        assert!(highlighted.highlighted);
    }

    #[test]
    fn test_row_state() {
        let state = RowState {
            size: SizeState::Measured,
            highlight: HighlightState::Unhighlighted,
        };
        assert!(!state.is_settled());
    }
}
