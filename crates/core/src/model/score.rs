use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ScoreId, UserId};
use crate::model::keys::{CategoryKey, ChapterKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score {score} exceeds maximum {max}")]
    OutOfRange { score: u32, max: u32 },

    #[error("maximum score must be > 0")]
    ZeroMaximum,

    #[error("free-response item numbers start at 1")]
    ZeroItem,
}

fn check_range(score: u32, max: u32) -> Result<(), ScoreError> {
    if max == 0 {
        return Err(ScoreError::ZeroMaximum);
    }
    if score > max {
        return Err(ScoreError::OutOfRange { score, max });
    }
    Ok(())
}

//
// ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────────
//

/// One scored multiple-choice quiz attempt for a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqScoreEntry {
    pub id: ScoreId,
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub user_id: UserId,
    pub correct: u32,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}

/// An MCQ score before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMcqScore {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub user_id: UserId,
    pub correct: u32,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}

impl NewMcqScore {
    /// # Errors
    ///
    /// Returns `ScoreError` if `total` is zero or `correct > total`.
    pub fn new(
        category: CategoryKey,
        chapter: ChapterKey,
        user_id: UserId,
        correct: u32,
        total: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ScoreError> {
        check_range(correct, total)?;
        Ok(Self {
            category,
            chapter,
            user_id,
            correct,
            total,
            created_at,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: ScoreId) -> McqScoreEntry {
        McqScoreEntry {
            id,
            category: self.category,
            chapter: self.chapter,
            user_id: self.user_id,
            correct: self.correct,
            total: self.total,
            created_at: self.created_at,
        }
    }
}

//
// ─── FREE RESPONSE ─────────────────────────────────────────────────────────────
//

/// One scored free-response submission.
///
/// `item` numbers the question within its chapter. Every entry counts toward
/// the chapter's FRQ requirement, resubmissions included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrqScoreEntry {
    pub id: ScoreId,
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub user_id: UserId,
    pub item: u32,
    pub score: u32,
    pub max_score: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFrqScore {
    pub category: CategoryKey,
    pub chapter: ChapterKey,
    pub user_id: UserId,
    pub item: u32,
    pub score: u32,
    pub max_score: u32,
    pub created_at: DateTime<Utc>,
}

impl NewFrqScore {
    /// # Errors
    ///
    /// Returns `ScoreError` for item 0, a zero maximum, or `score > max_score`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        category: CategoryKey,
        chapter: ChapterKey,
        user_id: UserId,
        item: u32,
        score: u32,
        max_score: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ScoreError> {
        if item == 0 {
            return Err(ScoreError::ZeroItem);
        }
        check_range(score, max_score)?;
        Ok(Self {
            category,
            chapter,
            user_id,
            item,
            score,
            max_score,
            created_at,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: ScoreId) -> FrqScoreEntry {
        FrqScoreEntry {
            id,
            category: self.category,
            chapter: self.chapter,
            user_id: self.user_id,
            item: self.item,
            score: self.score,
            max_score: self.max_score,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn keys() -> (CategoryKey, ChapterKey) {
        (
            CategoryKey::new("micro").unwrap(),
            ChapterKey::new("factor-markets").unwrap(),
        )
    }

    #[test]
    fn mcq_score_rejects_overflowing_correct_count() {
        let (cat, ch) = keys();
        let err = NewMcqScore::new(cat, ch, UserId::new("u"), 11, 10, fixed_now()).unwrap_err();
        assert_eq!(err, ScoreError::OutOfRange { score: 11, max: 10 });
    }

    #[test]
    fn frq_score_requires_positive_item() {
        let (cat, ch) = keys();
        let err = NewFrqScore::new(cat, ch, UserId::new("u"), 0, 3, 5, fixed_now()).unwrap_err();
        assert_eq!(err, ScoreError::ZeroItem);
    }

    #[test]
    fn frq_score_assigns_id() {
        let (cat, ch) = keys();
        let entry = NewFrqScore::new(cat, ch, UserId::new("u"), 2, 3, 5, fixed_now())
            .unwrap()
            .assign_id(ScoreId::new(4));
        assert_eq!(entry.id, ScoreId::new(4));
        assert_eq!(entry.item, 2);
    }
}
