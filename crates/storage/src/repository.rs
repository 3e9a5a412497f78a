use async_trait::async_trait;
use progress_core::model::{
    AuthToken, CategoryScope, ContentType, FrqScoreEntry, McqScoreEntry, NewFrqScore,
    NewMcqScore, NewProgressRecord, ProgressId, ProgressQuery, ProgressRecord, ProgressUpdate,
    ScoreId,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("missing or empty auth token")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Rejects reads that arrive without a bearer token.
///
/// The local stores do not verify tokens against an issuer; they only refuse
/// to answer anonymous reads.
///
/// # Errors
///
/// Returns `StorageError::Unauthorized` for an empty token.
pub fn authorize(token: &AuthToken) -> Result<(), StorageError> {
    if token.expose().trim().is_empty() {
        return Err(StorageError::Unauthorized);
    }
    Ok(())
}

/// Repository contract for per-chapter progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Scoped read: every record for one (user, category, chapter, type) key,
    /// oldest first. Callers treat the first element as authoritative.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` without a token, or another
    /// `StorageError` if the store cannot be read.
    async fn query_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Every record of one content type for a user within a category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` without a token, or another
    /// `StorageError` if the store cannot be read.
    async fn list_progress(
        &self,
        scope: &CategoryScope,
        content_type: ContentType,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert a new record and return the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn create_progress(&self, record: NewProgressRecord) -> Result<ProgressId, StorageError>;

    /// Overwrite `progress` and `created_at` on an existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record has this id.
    async fn update_progress(
        &self,
        id: ProgressId,
        update: &ProgressUpdate,
    ) -> Result<(), StorageError>;
}

/// Repository contract for scored MCQ and FRQ submissions.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be stored.
    async fn append_mcq_score(&self, score: NewMcqScore) -> Result<ScoreId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be stored.
    async fn append_frq_score(&self, score: NewFrqScore) -> Result<ScoreId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` without a token, or another
    /// `StorageError` if the store cannot be read.
    async fn mcq_scores(&self, scope: &CategoryScope) -> Result<Vec<McqScoreEntry>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` without a token, or another
    /// `StorageError` if the store cannot be read.
    async fn frq_scores(&self, scope: &CategoryScope) -> Result<Vec<FrqScoreEntry>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    next_progress_id: u64,
    next_score_id: u64,
    progress: Vec<ProgressRecord>,
    mcq: Vec<McqScoreEntry>,
    frq: Vec<FrqScoreEntry>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Records are kept in insertion order, which is also id order.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn query_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        authorize(&query.token)?;
        let guard = self.lock()?;
        Ok(guard
            .progress
            .iter()
            .filter(|r| query.key.matches(r))
            .cloned()
            .collect())
    }

    async fn list_progress(
        &self,
        scope: &CategoryScope,
        content_type: ContentType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        authorize(&scope.token)?;
        let guard = self.lock()?;
        Ok(guard
            .progress
            .iter()
            .filter(|r| {
                r.user_id == scope.user_id
                    && r.category == scope.category
                    && r.content_type == content_type
            })
            .cloned()
            .collect())
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<ProgressId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_progress_id += 1;
        let id = ProgressId::new(guard.next_progress_id);
        guard.progress.push(record.assign_id(id));
        Ok(id)
    }

    async fn update_progress(
        &self,
        id: ProgressId,
        update: &ProgressUpdate,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let record = guard
            .progress
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::NotFound)?;
        record.apply(update);
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn append_mcq_score(&self, score: NewMcqScore) -> Result<ScoreId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_score_id += 1;
        let id = ScoreId::new(guard.next_score_id);
        guard.mcq.push(score.assign_id(id));
        Ok(id)
    }

    async fn append_frq_score(&self, score: NewFrqScore) -> Result<ScoreId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_score_id += 1;
        let id = ScoreId::new(guard.next_score_id);
        guard.frq.push(score.assign_id(id));
        Ok(id)
    }

    async fn mcq_scores(&self, scope: &CategoryScope) -> Result<Vec<McqScoreEntry>, StorageError> {
        authorize(&scope.token)?;
        let guard = self.lock()?;
        Ok(guard
            .mcq
            .iter()
            .filter(|s| s.user_id == scope.user_id && s.category == scope.category)
            .cloned()
            .collect())
    }

    async fn frq_scores(&self, scope: &CategoryScope) -> Result<Vec<FrqScoreEntry>, StorageError> {
        authorize(&scope.token)?;
        let guard = self.lock()?;
        Ok(guard
            .frq
            .iter()
            .filter(|s| s.user_id == scope.user_id && s.category == scope.category)
            .cloned()
            .collect())
    }
}

/// Aggregates progress and score repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self { progress, scores }
    }
}
