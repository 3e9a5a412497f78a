//! Keyed cache of scoped progress reads with reactive delivery.
//!
//! Every `ProgressKey` owns a `watch` channel. Subscribers see `Pending`
//! until the first read lands, then `Ready` with the scoped records. A read
//! that returns the same records as before does not wake subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use progress_core::model::{ProgressKey, ProgressQuery, ProgressRecord};
use storage::repository::{ProgressRepository, StorageError};
use tokio::sync::watch;

/// What a subscriber currently sees for one key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    /// No identity; nothing will be requested.
    Suspended,
    /// A read is outstanding (or has never succeeded).
    #[default]
    Pending,
    /// Records for the key, oldest first.
    Ready(Vec<ProgressRecord>),
}

impl FetchState {
    #[must_use]
    pub fn records(&self) -> Option<&[ProgressRecord]> {
        match self {
            FetchState::Ready(records) => Some(records),
            FetchState::Suspended | FetchState::Pending => None,
        }
    }
}

type Channels = HashMap<ProgressKey, Arc<watch::Sender<FetchState>>>;

#[derive(Clone)]
pub struct ProgressFetcher {
    progress: Arc<dyn ProgressRepository>,
    channels: Arc<Mutex<Channels>>,
}

impl ProgressFetcher {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            progress,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A receiver that stays `Suspended`, for sessions without an identity.
    #[must_use]
    pub fn suspended() -> watch::Receiver<FetchState> {
        watch::channel(FetchState::Suspended).1
    }

    /// Subscribes to `key` without issuing a read.
    #[must_use]
    pub fn subscribe(&self, key: &ProgressKey) -> watch::Receiver<FetchState> {
        self.sender(key).subscribe()
    }

    /// Reads the query's key and delivers the result to subscribers if it changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails; the delivered state is left as it was.
    pub async fn refresh(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let key = &query.key;
        let tx = self.sender(key);
        let records = self.progress.query_progress(query).await?;
        let changed = tx.send_if_modified(|state| match state {
            FetchState::Ready(current) if *current == records => false,
            _ => {
                *state = FetchState::Ready(records.clone());
                true
            }
        });
        tracing::debug!(key = %key.path(), records = records.len(), changed, "progress read");
        Ok(records)
    }

    /// Drops the cached value back to `Pending` and re-reads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the re-read fails; subscribers stay `Pending`.
    pub async fn invalidate(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.sender(&query.key).send_replace(FetchState::Pending);
        self.refresh(query).await
    }

    fn sender(&self, key: &ProgressKey) -> Arc<watch::Sender<FetchState>> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            channels
                .entry(key.clone())
                .or_insert_with(|| Arc::new(watch::channel(FetchState::Pending).0)),
        )
    }
}
