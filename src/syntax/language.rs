// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Language resolution for code fences.
//!
//! Code blocks carry a free-form language id (`rust`, `ts`, `Python`, ...).
//! This module maps those ids onto the languages the tokenizer understands and
//! keeps per-language settings.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Languages with a dedicated grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Rust,
    JavaScript,
    TypeScript,
    Python,
    Json,
    Html,
    Css,
    Markdown,
    Yaml,
    Toml,
    Sql,
    /// Plain text (no highlighting)
    PlainText,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::Rust,
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Json,
        Language::Html,
        Language::Css,
        Language::Markdown,
        Language::Yaml,
        Language::Toml,
        Language::Sql,
        Language::PlainText,
    ];

    /// Returns the display name of the language.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Json => "JSON",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::Markdown => "Markdown",
            Language::Yaml => "YAML",
            Language::Toml => "TOML",
            Language::Sql => "SQL",
            Language::PlainText => "Plain Text",
        }
    }

    /// Returns the file extension synoptic knows this language by.
    pub fn primary_extension(self) -> &'static str {
        match self {
            Language::Rust => "rs",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Python => "py",
            Language::Json => "json",
            Language::Html => "html",
            Language::Css => "css",
            Language::Markdown => "md",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Sql => "sql",
            Language::PlainText => "txt",
        }
    }

    /// Returns true if the language is tokenized at all.
    pub fn is_highlighted(self) -> bool {
        self != Language::PlainText
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Configuration for a specific language's highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    pub language: Language,
    /// Whether highlighting is enabled for this language
    pub enabled: bool,
    /// Tab width handed to the grammar
    pub tab_width: usize,
}

impl LanguageConfig {
    /// Creates a new language configuration with default settings.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            enabled: language.is_highlighted(),
            tab_width: 4,
        }
    }

    /// Creates a language configuration with highlighting disabled.
    pub fn disabled(language: Language) -> Self {
        Self {
            enabled: false,
            ..Self::new(language)
        }
    }
}

/// Built-in fence ids, all lowercase.
static ALIAS_MAP: Lazy<HashMap<&'static str, Language>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert("rust", Language::Rust);
    map.insert("rs", Language::Rust);
    map.insert("javascript", Language::JavaScript);
    map.insert("js", Language::JavaScript);
    map.insert("jsx", Language::JavaScript);
    map.insert("mjs", Language::JavaScript);
    map.insert("cjs", Language::JavaScript);
    map.insert("typescript", Language::TypeScript);
    map.insert("ts", Language::TypeScript);
    map.insert("tsx", Language::TypeScript);
    map.insert("python", Language::Python);
    map.insert("py", Language::Python);
    map.insert("json", Language::Json);
    map.insert("jsonc", Language::Json);
    map.insert("html", Language::Html);
    map.insert("htm", Language::Html);
    map.insert("xml", Language::Html);
    map.insert("css", Language::Css);
    map.insert("scss", Language::Css);
    map.insert("markdown", Language::Markdown);
    map.insert("md", Language::Markdown);
    map.insert("yaml", Language::Yaml);
    map.insert("yml", Language::Yaml);
    map.insert("toml", Language::Toml);
    map.insert("sql", Language::Sql);
    map.insert("text", Language::PlainText);
    map.insert("txt", Language::PlainText);
    map.insert("plaintext", Language::PlainText);

    map
});

/// Resolves fence language ids, with optional host-registered aliases.
#[derive(Debug, Default, Clone)]
pub struct LanguageRegistry {
    /// Custom aliases, keyed by lowercase id. Checked before the built-ins.
    aliases: HashMap<String, Language>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a fence id to a language.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Unknown or empty ids resolve to [`Language::PlainText`].
    pub fn resolve(&self, id: &str) -> Language {
        let id = id.trim().to_lowercase();
        if let Some(&language) = self.aliases.get(&id) {
            return language;
        }
        ALIAS_MAP
            .get(id.as_str())
            .copied()
            .unwrap_or(Language::PlainText)
    }

    /// Registers a custom alias. Returns the language it previously mapped to.
    pub fn register_alias(&mut self, id: &str, language: Language) -> Option<Language> {
        self.aliases.insert(id.trim().to_lowercase(), language)
    }

    pub fn remove_alias(&mut self, id: &str) -> Option<Language> {
        self.aliases.remove(&id.trim().to_lowercase())
    }

    /// Returns every id (built-in or custom) that resolves to `language`, sorted.
    pub fn aliases_for(&self, language: Language) -> Vec<String> {
        let mut ids: Vec<String> = ALIAS_MAP
            .keys()
            .filter(|id| !self.aliases.contains_key(**id))
            .map(|id| id.to_string())
            .chain(self.aliases.keys().cloned())
            .filter(|id| self.resolve(id) == language)
            .collect();
        ids.sort();
        ids
    }

    /// Returns the total number of built-in ids.
    pub fn builtin_alias_count() -> usize {
        ALIAS_MAP.len()
    }

    /// Returns all supported languages.
    pub fn supported_languages() -> Vec<Language> {
        Language::ALL.to_vec()
    }
}
