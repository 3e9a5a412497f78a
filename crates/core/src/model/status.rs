use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::keys::kebab_case;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatusError {
    #[error("unknown progress key: {0}")]
    UnknownKey(String),

    #[error("unknown progress label: {0}")]
    UnknownLabel(String),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

//
// ─── PROGRESS STATUS ───────────────────────────────────────────────────────────
//

/// Icon shown next to a status option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusIcon {
    Cross,
    OpenBook,
    Check,
}

/// Three-state progress for a chapter.
///
/// Each variant carries its own descriptor (label, storage key, icon) so the
/// mapping between stored keys and display options never depends on list
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// All statuses in display order.
    pub const ALL: [ProgressStatus; 3] = [
        ProgressStatus::NotStarted,
        ProgressStatus::InProgress,
        ProgressStatus::Completed,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "Not Started",
            ProgressStatus::InProgress => "In Progress",
            ProgressStatus::Completed => "Completed",
        }
    }

    /// Canonical storage key. Always equal to `kebab_case(self.label())`.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not-started",
            ProgressStatus::InProgress => "in-progress",
            ProgressStatus::Completed => "completed",
        }
    }

    #[must_use]
    pub fn icon(self) -> StatusIcon {
        match self {
            ProgressStatus::NotStarted => StatusIcon::Cross,
            ProgressStatus::InProgress => StatusIcon::OpenBook,
            ProgressStatus::Completed => StatusIcon::Check,
        }
    }

    /// Decodes a stored key.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::UnknownKey` for anything other than the three
    /// canonical keys.
    pub fn from_key(key: &str) -> Result<Self, StatusError> {
        Self::ALL
            .into_iter()
            .find(|status| status.key() == key)
            .ok_or_else(|| StatusError::UnknownKey(key.to_owned()))
    }

    /// Decodes a human-readable label by canonicalizing it first, so
    /// `"in progress"` and `"In Progress"` resolve to the same status.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::UnknownLabel` if the canonical form is not a known key.
    pub fn from_label(label: &str) -> Result<Self, StatusError> {
        Self::from_key(&kebab_case(label)).map_err(|_| StatusError::UnknownLabel(label.to_owned()))
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, ProgressStatus::Completed)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProgressStatus {
    type Err = StatusError;

    /// Accepts either the storage key or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).or_else(|_| Self::from_label(s))
    }
}

//
// ─── CONTENT TYPE ──────────────────────────────────────────────────────────────
//

/// The three progress streams tracked per chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Slide,
    Mcq,
    Frq,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Slide => "slide",
            ContentType::Mcq => "mcq",
            ContentType::Frq => "frq",
        }
    }

    /// # Errors
    ///
    /// Returns `StatusError::UnknownContentType` for unrecognized values.
    pub fn parse(raw: &str) -> Result<Self, StatusError> {
        match raw {
            "slide" => Ok(ContentType::Slide),
            "mcq" => Ok(ContentType::Mcq),
            "frq" => Ok(ContentType::Frq),
            other => Err(StatusError::UnknownContentType(other.to_owned())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
