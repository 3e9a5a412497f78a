//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::model::ScoreError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `StatusControlService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatusSyncError {
    /// A create or update was rejected. The local selection stays optimistic
    /// until the next successful read replaces it.
    #[error("progress write failed: {0}")]
    Write(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScoreService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreServiceError {
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error("no signed-in user")]
    SignedOut,
    #[error("chapter {chapter} is not part of category {category}")]
    UnknownChapter { category: String, chapter: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
