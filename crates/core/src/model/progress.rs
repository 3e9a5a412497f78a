use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AuthToken, ProgressId, UserId};
use crate::model::keys::{CategoryKey, ChapterKey, KeyError};
use crate::model::status::{ContentType, ProgressStatus, StatusError};

//
// ─── PATH ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    #[error("expected <category>/<chapter>/<type>, got {0}")]
    Shape(String),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    ContentType(#[from] StatusError),
}

/// Curriculum location of a progress stream, without the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressPath {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub content_type: ContentType,
}

impl ProgressPath {
    #[must_use]
    pub fn new(category: CategoryKey, chapter: ChapterKey, content_type: ContentType) -> Self {
        Self {
            category,
            chapter,
            content_type,
        }
    }

    /// Parses a slug such as `micro/supply-and-demand/slide`.
    ///
    /// # Errors
    ///
    /// Returns `PathError` if the slug does not have exactly three valid segments.
    pub fn parse(slug: &str) -> Result<Self, PathError> {
        let mut parts = slug.trim_matches('/').split('/');
        let (Some(category), Some(chapter), Some(content_type), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PathError::Shape(slug.to_owned()));
        };
        Ok(Self {
            category: CategoryKey::new(category)?,
            chapter: ChapterKey::new(chapter)?,
            content_type: ContentType::parse(content_type)?,
        })
    }

    #[must_use]
    pub fn for_user(&self, user_id: UserId) -> ProgressKey {
        ProgressKey::new(
            user_id,
            self.category.clone(),
            self.chapter.clone(),
            self.content_type,
        )
    }
}

//
// ─── KEY ───────────────────────────────────────────────────────────────────────
//

/// Addresses one user's progress on one chapter's content stream.
///
/// At most one live record exists per key; the first record a scoped query
/// returns is the authoritative one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressKey {
    pub user_id: UserId,
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl ProgressKey {
    #[must_use]
    pub fn new(
        user_id: UserId,
        category: CategoryKey,
        chapter: ChapterKey,
        content_type: ContentType,
    ) -> Self {
        Self {
            user_id,
            category,
            chapter,
            content_type,
        }
    }

    /// Path form used in logs, e.g. `micro/supply-and-demand/slide`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.category, self.chapter, self.content_type)
    }

    #[must_use]
    pub fn matches(&self, record: &ProgressRecord) -> bool {
        record.user_id == self.user_id
            && record.category == self.category
            && record.chapter == self.chapter
            && record.content_type == self.content_type
    }
}

//
// ─── READ SCOPES ───────────────────────────────────────────────────────────────
//

/// A scoped read of one key, carrying the caller's bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressQuery {
    pub key: ProgressKey,
    pub token: AuthToken,
}

impl ProgressQuery {
    #[must_use]
    pub fn new(key: ProgressKey, token: AuthToken) -> Self {
        Self { key, token }
    }
}

/// A read of everything one user has within a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryScope {
    pub user_id: UserId,
    pub category: CategoryKey,
    pub token: AuthToken,
}

impl CategoryScope {
    #[must_use]
    pub fn new(user_id: UserId, category: CategoryKey, token: AuthToken) -> Self {
        Self {
            user_id,
            category,
            token,
        }
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A persisted progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: ProgressId,
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub progress: ProgressStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(
            self.user_id.clone(),
            self.category.clone(),
            self.chapter.clone(),
            self.content_type,
        )
    }

    /// Applies an update in place. The identifier is never touched.
    pub fn apply(&mut self, update: &ProgressUpdate) {
        self.progress = update.progress;
        self.created_at = update.created_at;
    }
}

/// A record that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgressRecord {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub progress: ProgressStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewProgressRecord {
    #[must_use]
    pub fn for_key(key: &ProgressKey, progress: ProgressStatus, now: DateTime<Utc>) -> Self {
        Self {
            category: key.category.clone(),
            chapter: key.chapter.clone(),
            content_type: key.content_type,
            progress,
            user_id: key.user_id.clone(),
            created_at: now,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: ProgressId) -> ProgressRecord {
        ProgressRecord {
            id,
            category: self.category,
            chapter: self.chapter,
            content_type: self.content_type,
            progress: self.progress,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

/// Fields written when an existing record changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub progress: ProgressStatus,
    pub created_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
