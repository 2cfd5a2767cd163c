//! Query normalization.
//!
//! Raw input such as `"  cowboy  bebop/c!"` is split into its text, an
//! optional category selector and an optional force marker, then sanitized
//! into the text used for display, fetching and the cache key.

use crate::category::CategoryRegistry;
use crate::Result;
use regex::Regex;

/// Trailing character that forces a refresh past the cache.
pub const FORCE_MARKER: char = '!';

/// A parsed keystroke, rebuilt on every input change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Trimmed raw input.
    pub raw: String,
    /// Input ended with [`FORCE_MARKER`].
    pub force_refresh: bool,
    /// Empty, or `/<letter>` in lowercase.
    pub category_key: String,
    /// Resolved category name.
    pub category: String,
    /// Sanitized, case-preserving text.
    pub text: String,
    /// `prefix + lowercase(text) + category_key`.
    pub cache_key: String,
}

impl Query {
    /// Whether there is nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Parses raw input against a category registry.
#[derive(Debug, Clone)]
pub struct QueryParser {
    registry: CategoryRegistry,
    splitter: Regex,
    key_prefix: String,
}

impl QueryParser {
    /// Compile the splitter for `registry`; cache keys start with `key_prefix`.
    pub fn new(registry: CategoryRegistry, key_prefix: impl Into<String>) -> Result<Self> {
        let splitter = registry.splitter()?;
        Ok(Self {
            registry,
            splitter,
            key_prefix: key_prefix.into(),
        })
    }

    /// Build the cache key for already-sanitized text and a category key.
    pub fn cache_key(&self, text: &str, category_key: &str) -> String {
        format!("{}{}{}", self.key_prefix, text.to_lowercase(), category_key)
    }

    /// Parse one raw input.
    pub fn parse(&self, raw: &str) -> Query {
        let raw = raw.trim();
        let force_refresh = raw.ends_with(FORCE_MARKER);

        let (body, selector) = self.splitter.captures(raw).map_or((raw, ""), |caps| {
            let body = caps.get(1).map_or(raw, |m| m.as_str());
            let selector = caps.get(2).map_or("", |m| m.as_str());
            (body, selector)
        });

        let category_key = selector.to_ascii_lowercase();
        let category = category_key
            .strip_prefix('/')
            .and_then(|letter| self.registry.resolve(letter))
            .unwrap_or_else(|| self.registry.default_category())
            .to_string();

        let text = sanitize(body);
        let cache_key = self.cache_key(&text, &category_key);

        Query {
            raw: raw.to_string(),
            force_refresh,
            category_key,
            category,
            text,
            cache_key,
        }
    }
}

/// `!`-`/`, `:`-`?`, `[`-`` ` ``, `{`-`~` and ASCII whitespace. `@` is kept.
const fn is_boundary_noise(c: char) -> bool {
    matches!(c, '!'..='/' | ':'..='?' | '['..='`' | '{'..='~') || c.is_ascii_whitespace()
}

/// Trim ASCII punctuation and whitespace at both ends and collapse interior
/// whitespace runs of two or more into one space.
///
/// Idempotent; interior non-whitespace characters are never touched.
pub fn sanitize(s: &str) -> String {
    let trimmed = s.trim_matches(is_boundary_noise);
    let mut out = String::with_capacity(trimmed.len());
    let mut run = String::new();
    for c in trimmed.chars() {
        if c.is_ascii_whitespace() {
            run.push(c);
            continue;
        }
        match run.chars().count() {
            0 => {},
            1 => out.push_str(&run),
            _ => out.push(' '),
        }
        run.clear();
        out.push(c);
    }
    out
}
