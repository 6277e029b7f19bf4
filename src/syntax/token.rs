// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tokens produced by a [`Tokenizer`](super::Tokenizer).

/// A contiguous span of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The text content of the token
    pub content: String,
    /// The tokenizer's classification, `None` for plain text
    pub scope: Option<String>,
}

impl Token {
    pub fn new(content: impl Into<String>, scope: Option<String>) -> Self {
        Self {
            content: content.into(),
            scope,
        }
    }

    /// Creates a token for plain text (no highlighting).
    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, None)
    }

    /// Creates a token classified as `scope`.
    pub fn scoped(content: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::new(content, Some(scope.into()))
    }

    /// Returns true if this token should be highlighted.
    pub fn is_highlighted(&self) -> bool {
        self.scope.is_some()
    }

    /// Returns the length of the token text in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The ordered tokens covering exactly one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLine {
    tokens: Vec<Token>,
}

impl TokenLine {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// A line with no classification at all. Empty lines have no tokens.
    pub fn plain(line: &str) -> Self {
        if line.is_empty() {
            Self::default()
        } else {
            Self::new(vec![Token::plain(line)])
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Concatenated token content.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.content.as_str()).collect()
    }

    /// Returns true if the tokens reproduce `line` exactly.
    pub fn round_trips(&self, line: &str) -> bool {
        let mut rest = line;
        for token in &self.tokens {
            match rest.strip_prefix(token.content.as_str()) {
                Some(tail) => rest = tail,
                None => return false,
            }
        }
        rest.is_empty()
    }
}

impl From<Vec<Token>> for TokenLine {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl<'a> IntoIterator for &'a TokenLine {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
