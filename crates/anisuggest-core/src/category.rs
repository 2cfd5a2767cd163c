use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category name that disables the category-match bonus filter.
pub const WILDCARD_CATEGORY: &str = "all";

/// Closed mapping of one-letter selectors to category names.
///
/// The empty letter names the default category used when the query carries
/// no `/<letter>` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    entries: BTreeMap<String, String>,
}

impl CategoryRegistry {
    /// Registry of the anidb.net search types.
    pub fn anidb() -> Self {
        Self::from_pairs([
            ("a", "all"),
            ("c", "character"),
            ("k", "club"),
            ("l", "collection"),
            ("r", "creator"),
            ("g", "group"),
            ("s", "song"),
            ("t", "tag"),
            ("u", "user"),
            ("", "anime"),
        ])
    }

    /// Build a registry from `(letter, name)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(letter, name)| (letter.to_ascii_lowercase(), name.to_string()))
            .collect();
        Self { entries }
    }

    /// Category used when no selector is given.
    pub fn default_category(&self) -> &str {
        self.entries.get("").map_or("", String::as_str)
    }

    /// Resolve a selector letter, case-insensitively.
    pub fn resolve(&self, letter: &str) -> Option<&str> {
        self.entries
            .get(&letter.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Registered selector letters, excluding the default entry.
    pub fn letters(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|letter| !letter.is_empty())
    }

    /// Check that the registry has a default entry and only single ASCII letters.
    pub fn validate(&self) -> Result<()> {
        if self.default_category().is_empty() {
            return Err(Error::Config(
                "category registry needs a default entry under the empty letter".into(),
            ));
        }
        for letter in self.letters() {
            let mut chars = letter.chars();
            let valid = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic());
            if !valid {
                return Err(Error::Config(format!(
                    "category selector '{letter}' must be a single ASCII letter"
                )));
            }
        }
        Ok(())
    }

    /// Anchored pattern `(text)(/<letter>)?!?` recognizing only registered letters.
    pub(crate) fn splitter(&self) -> Result<Regex> {
        let mut class = String::new();
        for letter in self.letters() {
            class.push_str(&regex::escape(letter));
        }
        let pattern = if class.is_empty() {
            r"(?is)^(.*?)()!?$".to_string()
        } else {
            format!(r"(?is)^(.*?)(/[{class}])?!?$")
        };
        Regex::new(&pattern).map_err(|e| Error::Config(format!("invalid category pattern: {e}")))
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::anidb()
    }
}
