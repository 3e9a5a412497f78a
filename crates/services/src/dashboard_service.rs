use std::sync::Arc;

use progress_core::aggregate::DashboardSnapshot;
use progress_core::join::DashboardJoin;
use progress_core::model::{CategoryKey, CategoryScope, ContentType, Curriculum};
use storage::repository::{ProgressRepository, ScoreRepository};

use crate::error::DashboardError;
use crate::identity::IdentityProvider;

/// Per-category dashboard state kept between refreshes.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    category: CategoryKey,
    scope: Option<CategoryScope>,
    join: DashboardJoin,
}

impl DashboardSession {
    #[must_use]
    pub fn category(&self) -> &CategoryKey {
        &self.category
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.scope.is_none()
    }

    /// Last snapshot built from a complete set of reads.
    #[must_use]
    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.join.snapshot()
    }
}

/// Loads the three dashboard sources and joins them with the curriculum.
#[derive(Clone)]
pub struct DashboardService {
    progress: Arc<dyn ProgressRepository>,
    scores: Arc<dyn ScoreRepository>,
    curriculum: Arc<Curriculum>,
    identity: Arc<dyn IdentityProvider>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        scores: Arc<dyn ScoreRepository>,
        curriculum: Arc<Curriculum>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            progress,
            scores,
            curriculum,
            identity,
        }
    }

    /// Opens a dashboard for one category. Nothing is read yet.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::UnknownCategory` if the curriculum has no such category.
    pub fn open(&self, category: &CategoryKey) -> Result<DashboardSession, DashboardError> {
        if self.curriculum.category(category).is_none() {
            return Err(DashboardError::UnknownCategory(category.to_string()));
        }
        Ok(DashboardSession {
            category: category.clone(),
            scope: self
                .identity
                .current()
                .map(|identity| CategoryScope::new(identity.user_id, category.clone(), identity.token)),
            join: DashboardJoin::new(self.curriculum.requirements_for(category)),
        })
    }

    /// Re-reads all three sources concurrently and rebuilds the snapshot.
    ///
    /// Returns `None` for a suspended session. If any read fails the previous
    /// snapshot stays in place and no partial one is built.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` for the first failed read.
    pub async fn refresh<'s>(
        &self,
        session: &'s mut DashboardSession,
    ) -> Result<Option<&'s DashboardSnapshot>, DashboardError> {
        let Some(scope) = session.scope.clone() else {
            tracing::warn!(category = %session.category, "no identity; dashboard suspended");
            return Ok(None);
        };
        session.join.reset();

        let (slides, mcqs, frqs) = tokio::try_join!(
            self.progress.list_progress(&scope, ContentType::Slide),
            self.scores.mcq_scores(&scope),
            self.scores.frq_scores(&scope),
        )?;
        tracing::debug!(
            category = %scope.category,
            slides = slides.len(),
            mcqs = mcqs.len(),
            frqs = frqs.len(),
            "dashboard sources resolved"
        );

        session.join.resolve_slides(slides);
        session.join.resolve_mcqs(mcqs);
        Ok(session.join.resolve_frqs(frqs))
    }

    /// Opens, refreshes and returns an owned snapshot in one call.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError` if the category is unknown or a read fails.
    pub async fn load(
        &self,
        category: &CategoryKey,
    ) -> Result<Option<DashboardSnapshot>, DashboardError> {
        let mut session = self.open(category)?;
        Ok(self.refresh(&mut session).await?.cloned())
    }
}
