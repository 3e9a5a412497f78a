use std::sync::Arc;

use progress_core::model::Curriculum;
use storage::repository::Storage;

use crate::Clock;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::fetch::ProgressFetcher;
use crate::identity::IdentityProvider;
use crate::score_service::ScoreService;
use crate::status_service::StatusControlService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    curriculum: Arc<Curriculum>,
    fetcher: ProgressFetcher,
    status: Arc<StatusControlService>,
    dashboard: Arc<DashboardService>,
    scores: Arc<ScoreService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        curriculum: Curriculum,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, curriculum, identity))
    }

    /// Build services over an in-memory store.
    #[must_use]
    pub fn in_memory(
        clock: Clock,
        curriculum: Curriculum,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, curriculum, identity)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        curriculum: Curriculum,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let curriculum = Arc::new(curriculum);
        let fetcher = ProgressFetcher::new(Arc::clone(&storage.progress));
        let status = Arc::new(StatusControlService::new(
            clock,
            Arc::clone(&storage.progress),
            fetcher.clone(),
            Arc::clone(&identity),
        ));
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.scores),
            Arc::clone(&curriculum),
            Arc::clone(&identity),
        ));
        let scores = Arc::new(ScoreService::new(
            clock,
            Arc::clone(&storage.scores),
            Arc::clone(&curriculum),
            identity,
        ));

        Self {
            curriculum,
            fetcher,
            status,
            dashboard,
            scores,
        }
    }

    #[must_use]
    pub fn curriculum(&self) -> Arc<Curriculum> {
        Arc::clone(&self.curriculum)
    }

    #[must_use]
    pub fn fetcher(&self) -> ProgressFetcher {
        self.fetcher.clone()
    }

    #[must_use]
    pub fn status(&self) -> Arc<StatusControlService> {
        Arc::clone(&self.status)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn scores(&self) -> Arc<ScoreService> {
        Arc::clone(&self.scores)
    }
}
