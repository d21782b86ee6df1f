//! Template tokenizer for the potion engine.
//!
//! This crate splits a template string into an ordered sequence of static-text
//! and token segments under configurable delimiters, and parses token names
//! into a base data path plus an optional filter pipeline.
//!
//! # Example
//!
//! ```rust
//! use potion_parser::{Flag, Segment, Settings, Tokenizer};
//!
//! let tokenizer = Tokenizer::new(Settings::default()).unwrap();
//! let segments = tokenizer.tokenize("Hello, {{name}}!");
//!
//! assert_eq!(segments.len(), 3);
//! assert!(matches!(&segments[0], Segment::Static(s) if s == "Hello, "));
//! assert!(matches!(&segments[1], Segment::Token(t) if t.name == "name" && t.flag == Flag::None));
//! assert!(matches!(&segments[2], Segment::Static(s) if s == "!"));
//! ```
//!
//! # Token Syntax
//!
//! A token is `<start> <flag?> <name> <end>` where the optional flag is `!`
//! (negated boolean block) or `/` (closing tag). The name is a dot-separated
//! data path optionally followed by a filter pipeline:
//!
//! ```text
//! {{user.name | uppercase | truncate: 5, '...'}}
//! ```
//!
//! Matching is non-greedy: a token never spans across an unrelated delimiter
//! pair. Whitespace around the flag and name is tolerated and not part of the
//! parsed name; the raw matched text is retained so segments can reconstruct
//! the original template byte-for-byte.
//!
//! # Caching
//!
//! [`Tokenizer::tokenize`] memoizes its result per exact template string. The
//! cache is never invalidated automatically; callers rendering many distinct
//! one-off templates should call [`Tokenizer::clear_cache`] periodically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};

/// Default opening delimiter.
pub const DEFAULT_START: &str = "{{";

/// Default closing delimiter.
pub const DEFAULT_END: &str = "}}";

/// Default token-name grammar.
///
/// A data path (`[a-z0-9_$][a-z0-9_$.]*`, case-insensitive) optionally
/// followed by a non-greedy filter pipeline. The pipeline tail is lazy so the
/// overall token match stops at the first closing delimiter.
pub const DEFAULT_PATH: &str = r"[a-z0-9_$][a-z0-9_$.]*(?:\s*\|[^\r\n]*?)?";

/// Per-render tokenization settings: delimiters and the token-name grammar.
///
/// Two templates tokenized under different settings never share cached
/// segments because each [`Tokenizer`] owns its own cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Opening delimiter, e.g. `{{` or `[`.
    pub start: String,
    /// Closing delimiter, e.g. `}}` or `]`.
    pub end: String,
    /// Regular expression describing valid token-name text.
    pub path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}

impl Settings {
    /// Creates settings with the given delimiters and the default name grammar.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            path: DEFAULT_PATH.to_string(),
        }
    }

    /// Replaces the token-name grammar.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Token flag parsed from the character immediately after the start delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Plain substitution or block opener.
    None,
    /// `!` — inverts the condition of a boolean block.
    Negate,
    /// `/` — closes a block.
    Close,
}

/// A delimited placeholder in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Flag parsed from the token text.
    pub flag: Flag,
    /// Token name with surrounding whitespace removed (path plus pipeline).
    pub name: String,
    raw: String,
}

impl Token {
    /// The raw matched text, delimiters included.
    pub fn literal(&self) -> &str {
        &self.raw
    }
}

/// A discriminated unit of a tokenized template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text between tokens.
    Static(String),
    /// A delimited token.
    Token(Token),
}

impl Segment {
    /// The literal source text of this segment.
    ///
    /// Concatenating every segment's literal reconstructs the original
    /// template exactly.
    pub fn literal(&self) -> &str {
        match self {
            Segment::Static(text) => text,
            Segment::Token(token) => token.literal(),
        }
    }
}

/// Tokenizer with a compiled pattern and a per-template memoization cache.
#[derive(Debug)]
pub struct Tokenizer {
    pattern: Regex,
    settings: Settings,
    cache: Mutex<HashMap<String, Arc<Vec<Segment>>>>,
}

impl Tokenizer {
    /// Compiles the token pattern for the given settings.
    ///
    /// Fails if the settings' path grammar is not a valid regular expression.
    pub fn new(settings: Settings) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&format!(
            r"{}\s*([!/]?)\s*({})\s*{}",
            regex::escape(&settings.start),
            settings.path,
            regex::escape(&settings.end),
        ))
        .case_insensitive(true)
        .build()?;

        Ok(Self {
            pattern,
            settings,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// The settings this tokenizer was compiled from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Tokenizes a template, reusing a cached result for identical text.
    pub fn tokenize(&self, template: &str) -> Arc<Vec<Segment>> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(template) {
                return Arc::clone(hit);
            }
        }
        let segments = Arc::new(self.scan(template));
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(template.to_string(), Arc::clone(&segments));
        }
        segments
    }

    /// Drops every memoized tokenization.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn scan(&self, template: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in self.pattern.captures_iter(template) {
            let m = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            if m.start() > last {
                segments.push(Segment::Static(template[last..m.start()].to_string()));
            }
            let flag = match caps.get(1).map(|f| f.as_str()) {
                Some("!") => Flag::Negate,
                Some("/") => Flag::Close,
                _ => Flag::None,
            };
            segments.push(Segment::Token(Token {
                flag,
                name: caps[2].trim().to_string(),
                raw: m.as_str().to_string(),
            }));
            last = m.end();
        }

        if last < template.len() {
            segments.push(Segment::Static(template[last..].to_string()));
        }
        segments
    }
}

/// A literal argument in a filter stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Quoted or bare string.
    Str(String),
    /// Numeric literal.
    Num(f64),
    /// `true` or `false`.
    Bool(bool),
}

impl Arg {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.len() >= 2
            && ((text.starts_with('\'') && text.ends_with('\''))
                || (text.starts_with('"') && text.ends_with('"')))
        {
            return Arg::Str(text[1..text.len() - 1].to_string());
        }
        match text {
            "true" => Arg::Bool(true),
            "false" => Arg::Bool(false),
            _ => text
                .parse::<f64>()
                .map(Arg::Num)
                .unwrap_or_else(|_| Arg::Str(text.to_string())),
        }
    }
}

/// One `| name: arg, arg` stage of a token pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    /// Filter name.
    pub name: String,
    /// Static arguments parsed from the token text.
    pub args: Vec<Arg>,
}

impl FilterStage {
    fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((name, rest)) => Self {
                name: name.trim().to_string(),
                args: split_outside_quotes(rest, ',')
                    .into_iter()
                    .map(Arg::parse)
                    .collect(),
            },
            None => Self {
                name: text.trim().to_string(),
                args: Vec::new(),
            },
        }
    }
}

/// Parsed form of a token name: a base data path plus pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpec {
    /// Dot-separated path into the render data.
    pub base_key: String,
    /// Filter stages applied left-to-right to the resolved value.
    pub stages: Vec<FilterStage>,
}

impl TokenSpec {
    /// Parses a token name into its base key and pipeline stages.
    pub fn parse(name: &str) -> Self {
        let mut parts = split_outside_quotes(name, '|').into_iter();
        let base_key = parts.next().map(str::trim).unwrap_or("").to_string();
        let stages = parts
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    None
                } else {
                    Some(FilterStage::parse(part))
                }
            })
            .collect();
        Self { base_key, stages }
    }
}

/// The base data path of a token name, pipeline stages stripped.
///
/// Block boundaries are named by base key alone: a closing token matches an
/// opener when their base keys are equal, regardless of filters on either.
pub fn base_key(name: &str) -> &str {
    split_outside_quotes(name, '|')
        .first()
        .map(|part| part.trim())
        .unwrap_or("")
}

/// Splits on `sep`, ignoring separators inside single- or double-quoted runs.
fn split_outside_quotes(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                } else if ch == sep {
                    parts.push(&text[start..idx]);
                    start = idx + ch.len_utf8();
                }
            }
        }
    }
    parts.push(&text[start..]);
    parts
}
