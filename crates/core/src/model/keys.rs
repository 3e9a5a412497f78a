use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyError {
    #[error("{kind} key cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} key is not kebab-case: {raw}")]
    NotKebab { kind: &'static str, raw: String },
}

//
// ─── KEBAB CASE ────────────────────────────────────────────────────────────────
//

/// Converts a display title into its hyphenated key form.
///
/// Runs of anything that is not a letter or digit collapse into a single
/// hyphen, a lower-to-upper case boundary starts a new word, and the result is
/// lower-cased without consulting the process locale.
///
/// ```
/// use progress_core::model::kebab_case;
/// assert_eq!(kebab_case("Supply and Demand"), "supply-and-demand");
/// assert_eq!(kebab_case("Not Started"), "not-started");
/// assert_eq!(kebab_case("  Production, Cost  "), "production-cost");
/// ```
#[must_use]
pub fn kebab_case(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_break = false;
    let mut prev_lower = false;

    for ch in title.chars() {
        if !ch.is_alphanumeric() {
            pending_break = true;
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            pending_break = true;
        }
        if pending_break && !out.is_empty() {
            out.push('-');
        }
        pending_break = false;
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        out.extend(ch.to_lowercase());
    }

    out
}

fn validate(kind: &'static str, raw: String) -> Result<String, KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty { kind });
    }
    if kebab_case(&raw) != raw {
        return Err(KeyError::NotKebab { kind, raw });
    }
    Ok(raw)
}

//
// ─── KEYS ──────────────────────────────────────────────────────────────────────
//

/// Subject-area key, e.g. `micro`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Accepts an already-canonical key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the key is empty or not kebab-case.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        validate("category", raw.into()).map(Self)
    }

    /// Derives the key from a display title.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Empty` if the title has no letters or digits.
    pub fn from_title(title: &str) -> Result<Self, KeyError> {
        Self::new(kebab_case(title))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Chapter key, derived deterministically from the chapter title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChapterKey(String);

impl ChapterKey {
    /// Accepts an already-canonical key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the key is empty or not kebab-case.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        validate("chapter", raw.into()).map(Self)
    }

    /// Derives the key from a display title.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Empty` if the title has no letters or digits.
    pub fn from_title(title: &str) -> Result<Self, KeyError> {
        Self::new(kebab_case(title))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CategoryKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ChapterKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryKey> for String {
    fn from(value: CategoryKey) -> Self {
        value.0
    }
}

impl From<ChapterKey> for String {
    fn from(value: ChapterKey) -> Self {
        value.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
