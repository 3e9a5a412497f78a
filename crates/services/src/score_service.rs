use std::sync::Arc;

use progress_core::model::{
    CategoryKey, ChapterKey, Curriculum, NewFrqScore, NewMcqScore, ScoreId, UserId,
};
use storage::repository::ScoreRepository;

use crate::Clock;
use crate::error::ScoreServiceError;
use crate::identity::IdentityProvider;

/// Records scored MCQ sets and FRQ items for the signed-in user.
#[derive(Clone)]
pub struct ScoreService {
    clock: Clock,
    scores: Arc<dyn ScoreRepository>,
    curriculum: Arc<Curriculum>,
    identity: Arc<dyn IdentityProvider>,
}

impl ScoreService {
    #[must_use]
    pub fn new(
        clock: Clock,
        scores: Arc<dyn ScoreRepository>,
        curriculum: Arc<Curriculum>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            scores,
            curriculum,
            identity,
        }
    }

    /// # Errors
    ///
    /// Returns `ScoreServiceError` if nobody is signed in, the chapter is not
    /// in the curriculum, the score is out of range, or storage fails.
    pub async fn record_mcq(
        &self,
        category: &CategoryKey,
        chapter: &ChapterKey,
        correct: u32,
        total: u32,
    ) -> Result<ScoreId, ScoreServiceError> {
        let user_id = self.user_for(category, chapter)?;
        let score = NewMcqScore::new(
            category.clone(),
            chapter.clone(),
            user_id,
            correct,
            total,
            self.clock.now(),
        )?;
        let id = self.scores.append_mcq_score(score).await?;
        tracing::debug!(%category, %chapter, correct, total, "mcq score recorded");
        Ok(id)
    }

    /// Records one FRQ item. Resubmitting an item appends another entry, and
    /// every entry counts towards the chapter.
    ///
    /// # Errors
    ///
    /// Returns `ScoreServiceError` if nobody is signed in, the chapter is not
    /// in the curriculum, the score is invalid, or storage fails.
    pub async fn record_frq(
        &self,
        category: &CategoryKey,
        chapter: &ChapterKey,
        item: u32,
        score: u32,
        max_score: u32,
    ) -> Result<ScoreId, ScoreServiceError> {
        let user_id = self.user_for(category, chapter)?;
        let entry = NewFrqScore::new(
            category.clone(),
            chapter.clone(),
            user_id,
            item,
            score,
            max_score,
            self.clock.now(),
        )?;
        let id = self.scores.append_frq_score(entry).await?;
        tracing::debug!(%category, %chapter, item, score, max_score, "frq score recorded");
        Ok(id)
    }

    fn user_for(
        &self,
        category: &CategoryKey,
        chapter: &ChapterKey,
    ) -> Result<UserId, ScoreServiceError> {
        let identity = self.identity.current().ok_or(ScoreServiceError::SignedOut)?;
        let known = self
            .curriculum
            .category(category)
            .is_some_and(|c| c.chapters().iter().any(|ch| ch.key() == chapter));
        if !known {
            return Err(ScoreServiceError::UnknownChapter {
                category: category.to_string(),
                chapter: chapter.to_string(),
            });
        }
        Ok(identity.user_id)
    }
}
