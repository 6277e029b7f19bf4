// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The tokenizer interface and its synoptic-backed implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use once_cell::sync::OnceCell;
use synoptic::{Highlighter, TokOpt};

use crate::error::TokenizeError;
use crate::syntax::language::{Language, LanguageConfig, LanguageRegistry};
use crate::syntax::token::{Token, TokenLine};

/// Turns lines of source into token lines.
///
/// Implementations are shared by every code block in the process and may be
/// called from several worker threads at once. Calls block; the
/// [`WorkerPool`](crate::highlight::WorkerPool) keeps them off the owning
/// thread.
pub trait Tokenizer: Send + Sync {
    /// Tokenizes `lines` as `language_id`, a free-form fence id.
    ///
    /// Must return exactly one token line per input line.
    fn tokenize(&self, lines: &[String], language_id: &str) -> Result<Vec<TokenLine>, TokenizeError>;
}

/// Tokenizer backed by synoptic's regex grammars.
///
/// Grammars are built lazily the first time a language is used, so the first
/// call for a language is noticeably slower than the rest. Each language has
/// its own lock; callers only wait on each other when they share a language.
pub struct SynopticTokenizer {
    registry: LanguageRegistry,
    tab_width: usize,
    configs: HashMap<Language, LanguageConfig>,
    grammars: Mutex<HashMap<Language, GrammarSlot>>,
}

/// A grammar that is built at most once and then run by one caller at a time.
type GrammarSlot = Arc<OnceCell<Mutex<Highlighter>>>;

impl Default for SynopticTokenizer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SynopticTokenizer {
    pub fn new(tab_width: usize) -> Self {
        Self::with_registry(LanguageRegistry::new(), tab_width)
    }

    pub fn with_registry(registry: LanguageRegistry, tab_width: usize) -> Self {
        Self {
            registry,
            tab_width,
            configs: HashMap::new(),
            grammars: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the settings of one language.
    pub fn with_language_config(mut self, config: LanguageConfig) -> Self {
        self.configs.insert(config.language, config);
        self
    }

    /// Settings in effect for `language`.
    pub fn language_config(&self, language: Language) -> LanguageConfig {
        self.configs.get(&language).cloned().unwrap_or_else(|| LanguageConfig {
            tab_width: self.tab_width,
            ..LanguageConfig::new(language)
        })
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Returns the number of grammars built so far.
    pub fn loaded_grammars(&self) -> usize {
        self.grammars
            .lock()
            .map(|slots| slots.values().filter(|slot| slot.get().is_some()).count())
            .unwrap_or(0)
    }

    /// Returns the slot for `language`, holding the table lock only long
    /// enough to find or insert it.
    fn grammar_slot(&self, language: Language) -> Result<GrammarSlot, TokenizeError> {
        let mut slots = self.grammars.lock().map_err(|_| poisoned(language, "grammar table"))?;
        Ok(slots.entry(language).or_default().clone())
    }

    fn build_grammar(&self, language: Language) -> Highlighter {
        let start = Instant::now();
        let tab_width = self.language_config(language).tab_width;
        let (highlighter, source) = match synoptic::from_extension(language.primary_extension(), tab_width) {
            Some(highlighter) => (highlighter, "synoptic"),
            None => (fallback_grammar(language, tab_width), "fallback"),
        };
        tracing::debug!(
            language = %language,
            source,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "grammar initialized"
        );
        highlighter
    }
}

impl std::fmt::Debug for SynopticTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynopticTokenizer")
            .field("tab_width", &self.tab_width)
            .field("configs", &self.configs)
            .field("loaded_grammars", &self.loaded_grammars())
            .finish()
    }
}

impl Tokenizer for SynopticTokenizer {
    fn tokenize(&self, lines: &[String], language_id: &str) -> Result<Vec<TokenLine>, TokenizeError> {
        let language = self.registry.resolve(language_id);
        if !self.language_config(language).enabled {
            return Ok(lines.iter().map(|line| TokenLine::plain(line)).collect());
        }

        let slot = self.grammar_slot(language)?;
        let grammar = slot.get_or_init(|| Mutex::new(self.build_grammar(language)));
        let mut highlighter = grammar.lock().map_err(|_| poisoned(language, "grammar"))?;

        let owned = lines.to_vec();
        highlighter.run(&owned);

        let tab_width = self.language_config(language).tab_width;
        Ok(owned
            .iter()
            .enumerate()
            .map(|(y, line)| to_token_line(highlighter.line(y, line), line, tab_width))
            .collect())
    }
}

fn poisoned(language: Language, what: &str) -> TokenizeError {
    TokenizeError::Grammar {
        language: language.to_string(),
        reason: format!("{what} lock poisoned"),
    }
}

/// Converts synoptic's output for one line.
///
/// Synoptic expands tabs, so for indented lines the tokens are mapped back
/// onto the original text. Lines that still do not match are returned
/// unclassified.
fn to_token_line(raw: Vec<TokOpt>, line: &str, tab_width: usize) -> TokenLine {
    let tokens: Vec<Token> = raw
        .into_iter()
        .map(|tok| match tok {
            TokOpt::Some(text, kind) => Token::scoped(text, kind),
            TokOpt::None(text) => Token::plain(text),
        })
        .filter(|token| !token.is_empty())
        .collect();

    let token_line = TokenLine::new(tokens);
    if token_line.round_trips(line) {
        return token_line;
    }
    if line.contains('\t') {
        if let Some(realigned) = realign_tabs(&token_line, line, tab_width) {
            return realigned;
        }
    }
    TokenLine::plain(line)
}

/// Slices `line` along the boundaries of tokens produced from its
/// tab-expanded form. A tab split across two tokens goes to the first one.
fn realign_tabs(expanded: &TokenLine, line: &str, tab_width: usize) -> Option<TokenLine> {
    let text = expanded.text();
    let offsets = expansion_offsets(line, &text, tab_width, false)
        .or_else(|| expansion_offsets(line, &text, tab_width, true))?;

    let mut tokens = Vec::with_capacity(expanded.len());
    let mut expanded_end = 0;
    let mut from = 0;
    for token in expanded.tokens() {
        expanded_end += token.content.len();
        let index = offsets.partition_point(|&(start, _)| start < expanded_end);
        let to = offsets.get(index).map_or(line.len(), |&(_, byte)| byte);
        if to > from {
            tokens.push(Token::new(&line[from..to], token.scope.clone()));
        }
        from = to;
    }
    Some(TokenLine::new(tokens))
}

/// Expands the tabs in `line` and, if the result equals `expanded`, returns
/// each char's `(expanded offset, original offset)`.
///
/// Tabs become `tab_width` spaces, or with `to_tab_stop` pad to the next
/// multiple of `tab_width` columns.
fn expansion_offsets(line: &str, expanded: &str, tab_width: usize, to_tab_stop: bool) -> Option<Vec<(usize, usize)>> {
    let width = tab_width.max(1);
    let mut offsets = Vec::with_capacity(line.len());
    let mut position = 0;
    let mut column = 0;
    for (byte, ch) in line.char_indices() {
        offsets.push((position, byte));
        let (advance, columns) = match ch {
            '\t' => {
                let spaces = if to_tab_stop { width - column % width } else { width };
                (spaces, spaces)
            }
            _ => (ch.len_utf8(), 1),
        };
        let piece = expanded.get(position..position + advance)?;
        let matches = match ch {
            '\t' => piece.bytes().all(|b| b == b' '),
            _ => piece.starts_with(ch),
        };
        if !matches {
            return None;
        }
        position += advance;
        column += columns;
    }
    (position == expanded.len()).then_some(offsets)
}

/// Keyword, string and comment rules for languages synoptic has no grammar for.
fn fallback_grammar(language: Language, tab_width: usize) -> Highlighter {
    let mut highlighter = Highlighter::new(tab_width);

    match language {
        Language::Rust => {
            highlighter.keyword("keyword", r"\b(fn|let|mut|pub|struct|enum|impl|trait|use|mod|const|static|if|else|match|for|while|loop|break|continue|return)\b");
            highlighter.keyword("string", r#""[^"]*""#);
            highlighter.keyword("comment", r"//.*$");
            highlighter.bounded("comment", r"/\*", r"\*/", false);
        }
        Language::JavaScript | Language::TypeScript => {
            highlighter.keyword("keyword", r"\b(function|var|let|const|if|else|for|while|do|switch|case|break|continue|return|class|extends|import|export|from|default|async|await)\b");
            highlighter.keyword("string", r#""[^"]*"|'[^']*'|`[^`]*`"#);
            highlighter.keyword("comment", r"//.*$");
            highlighter.bounded("comment", r"/\*", r"\*/", false);
        }
        Language::Python => {
            highlighter.keyword("keyword", r"\b(def|class|if|elif|else|for|while|try|except|finally|with|import|from|as|return|yield|lambda|pass|break|continue)\b");
            highlighter.keyword("string", r#""[^"]*"|'[^']*'"#);
            highlighter.keyword("comment", r"#.*$");
        }
        Language::Json => {
            highlighter.keyword("string", r#""[^"]*""#);
            highlighter.keyword("number", r"\b\d+(\.\d+)?\b");
            highlighter.keyword("boolean", r"\b(true|false|null)\b");
        }
        Language::Sql => {
            highlighter.keyword("keyword", r"(?i)\b(select|from|where|insert|into|update|delete|create|table|join|on|group|by|order|limit|and|or|not|null)\b");
            highlighter.keyword("string", r"'[^']*'");
            highlighter.keyword("comment", r"--.*$");
        }
        _ => {
            highlighter.keyword("string", r#""[^"]*""#);
            highlighter.keyword("comment", r"//.*$|#.*$");
        }
    }

    highlighter
}
