use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use progress_core::model::{
    AuthToken, ProgressId, ProgressPath, ProgressQuery, ProgressRecord, ProgressStatus,
};
use progress_core::status_control::{Selection, StatusControl, StatusOption, WriteIntent};
use storage::repository::{ProgressRepository, StorageError};
use tokio::sync::watch;

use crate::Clock;
use crate::error::StatusSyncError;
use crate::fetch::{FetchState, ProgressFetcher};
use crate::identity::IdentityProvider;

/// What a call to `StatusControlService::select` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Nobody is signed in; nothing was sent.
    Suspended,
    /// The first read has not landed yet; the selection was dropped.
    Ignored,
    /// Same value as the current one; nothing was sent.
    Unchanged,
    /// Another call is writing; this selection will be sent after it.
    Queued,
    /// Writes were sent and the key was re-read. Carries the displayed status.
    Synced(ProgressStatus),
}

struct Bound {
    control: StatusControl,
    token: AuthToken,
}

impl Bound {
    fn query(&self) -> ProgressQuery {
        ProgressQuery::new(self.control.key().clone(), self.token.clone())
    }
}

struct SessionState {
    bound: Option<Bound>,
    receiver: watch::Receiver<FetchState>,
}

impl SessionState {
    /// Adopts a read unless a write is outstanding.
    fn settle(&mut self, records: &[ProgressRecord]) -> Option<ProgressStatus> {
        let bound = self.bound.as_mut()?;
        if bound.control.has_write_in_flight() {
            return None;
        }
        self.receiver.borrow_and_update();
        let status = bound.control.apply_snapshot(records);
        if bound.control.duplicates() > 0 {
            tracing::warn!(
                key = %bound.control.key().path(),
                duplicates = bound.control.duplicates(),
                "multiple progress records for one key; using the first"
            );
        }
        Some(status)
    }
}

/// A mounted selector for one chapter's progress stream.
///
/// Cloning shares the same state, so selections made from different tasks
/// are serialized through one write queue.
#[derive(Clone)]
pub struct ChapterStatusSession {
    path: ProgressPath,
    state: Arc<Mutex<SessionState>>,
}

impl ChapterStatusSession {
    #[must_use]
    pub fn path(&self) -> &ProgressPath {
        &self.path
    }

    /// True when mounted without an identity.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        lock(&self.state).bound.is_none()
    }

    /// What the fetch layer last delivered for this session's key.
    #[must_use]
    pub fn fetch_state(&self) -> FetchState {
        lock(&self.state).receiver.borrow().clone()
    }

    /// Current status, or `None` until the first read lands.
    #[must_use]
    pub fn displayed(&self) -> Option<ProgressStatus> {
        self.with_control(StatusControl::displayed).flatten()
    }

    /// Selector entries; empty while suspended or before the first read.
    #[must_use]
    pub fn options(&self) -> Vec<StatusOption> {
        self.with_control(StatusControl::options).unwrap_or_default()
    }

    /// Record the selector writes to, once known.
    #[must_use]
    pub fn record_id(&self) -> Option<ProgressId> {
        self.with_control(|c| c.baseline().and_then(|b| b.record))
            .flatten()
    }

    #[must_use]
    pub fn is_diverged(&self) -> bool {
        self.with_control(StatusControl::is_diverged)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.with_control(StatusControl::duplicates).unwrap_or(0)
    }

    /// Applies a delivery from the fetch layer if one arrived since the last
    /// call. Deliveries are held back while a write is outstanding.
    ///
    /// Returns `true` when the displayed value was replaced.
    pub fn poll_delivery(&self) -> bool {
        let mut state = lock(&self.state);
        let state = &mut *state;
        let Some(bound) = state.bound.as_mut() else {
            return false;
        };
        if bound.control.has_write_in_flight() || !state.receiver.has_changed().unwrap_or(false) {
            return false;
        }
        let delivered = state.receiver.borrow_and_update().clone();
        match delivered {
            FetchState::Ready(records) => {
                bound.control.apply_snapshot(&records);
                true
            }
            FetchState::Suspended | FetchState::Pending => false,
        }
    }

    fn query(&self) -> Option<ProgressQuery> {
        lock(&self.state).bound.as_ref().map(Bound::query)
    }

    fn with_control<T>(&self, f: impl FnOnce(&StatusControl) -> T) -> Option<T> {
        lock(&self.state).bound.as_ref().map(|bound| f(&bound.control))
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps single-chapter selectors in sync with the progress store.
#[derive(Clone)]
pub struct StatusControlService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    fetcher: ProgressFetcher,
    identity: Arc<dyn IdentityProvider>,
}

impl StatusControlService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        fetcher: ProgressFetcher,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            progress,
            fetcher,
            identity,
        }
    }

    /// Mounts a selector and performs the first scoped read.
    ///
    /// Without an identity the session is suspended: it watches a channel that
    /// stays `FetchState::Suspended` and nothing is requested.
    ///
    /// # Errors
    ///
    /// Returns `StatusSyncError::Storage` if the first read fails. The session
    /// is not returned in that case.
    pub async fn mount(&self, path: ProgressPath) -> Result<ChapterStatusSession, StatusSyncError> {
        let Some(identity) = self.identity.current() else {
            tracing::warn!(
                category = %path.category,
                chapter = %path.chapter,
                "no identity; progress selector suspended"
            );
            return Ok(ChapterStatusSession {
                path,
                state: Arc::new(Mutex::new(SessionState {
                    bound: None,
                    receiver: ProgressFetcher::suspended(),
                })),
            });
        };

        let key = path.for_user(identity.user_id);
        let receiver = self.fetcher.subscribe(&key);
        let session = ChapterStatusSession {
            path,
            state: Arc::new(Mutex::new(SessionState {
                bound: Some(Bound {
                    control: StatusControl::new(key),
                    token: identity.token,
                }),
                receiver,
            })),
        };
        self.refresh(&session).await?;
        Ok(session)
    }

    /// Re-reads the key and overwrites the displayed value with the result.
    ///
    /// Returns `None` for a suspended session, or while a write is
    /// outstanding (its own re-read follows once the queue drains).
    ///
    /// # Errors
    ///
    /// Returns `StatusSyncError::Storage` if the read fails.
    pub async fn refresh(
        &self,
        session: &ChapterStatusSession,
    ) -> Result<Option<ProgressStatus>, StatusSyncError> {
        let Some(query) = session.query() else {
            return Ok(None);
        };
        let records = self.fetcher.refresh(&query).await?;
        Ok(lock(&session.state).settle(&records))
    }

    /// Handles a user selection.
    ///
    /// At most one write is outstanding per session. The call that dispatched
    /// a write also sends anything queued behind it, then re-reads the key.
    ///
    /// # Errors
    ///
    /// Returns `StatusSyncError::Write` for the first rejected write. The key
    /// is re-read straight away; if that read fails too, the session keeps the
    /// selected value and reports `is_diverged` until a later read succeeds.
    pub async fn select(
        &self,
        session: &ChapterStatusSession,
        status: ProgressStatus,
    ) -> Result<SelectOutcome, StatusSyncError> {
        let state = &session.state;
        let (query, first) = {
            let mut state = lock(state);
            let Some(bound) = state.bound.as_mut() else {
                tracing::warn!("selection without identity dropped");
                return Ok(SelectOutcome::Suspended);
            };
            let selection = bound.control.select(status, self.clock.now());
            let key = bound.control.key();
            match selection {
                Selection::Ignored => return Ok(SelectOutcome::Ignored),
                Selection::Unchanged => return Ok(SelectOutcome::Unchanged),
                Selection::Queued => {
                    tracing::debug!(key = %key.path(), status = %status, "selection queued");
                    return Ok(SelectOutcome::Queued);
                }
                Selection::Dispatch(intent) => (bound.query(), intent),
            }
        };

        let key = &query.key;
        let mut failure = None;
        let mut next = Some(first);
        while let Some(intent) = next {
            tracing::debug!(key = %key.path(), status = %intent.progress(), "sending progress write");
            let result = self.send(intent).await;
            let now = self.clock.now();
            let mut state = lock(state);
            let Some(bound) = state.bound.as_mut() else {
                break;
            };
            next = match result {
                Ok(created) => bound.control.write_succeeded(created, now),
                Err(err) => {
                    tracing::warn!(key = %key.path(), error = %err, "progress write failed");
                    failure.get_or_insert(err);
                    bound.control.write_failed(now)
                }
            };
        }

        if let Some(err) = failure {
            match self.fetcher.invalidate(&query).await {
                Ok(records) => {
                    lock(state).settle(&records);
                }
                Err(read) => {
                    tracing::warn!(key = %key.path(), error = %read, "re-read after failed write failed");
                }
            }
            return Err(StatusSyncError::Write(err));
        }

        let records = self.fetcher.invalidate(&query).await?;
        Ok(match lock(state).settle(&records) {
            Some(status) => SelectOutcome::Synced(status),
            None => SelectOutcome::Queued,
        })
    }

    async fn send(&self, intent: WriteIntent) -> Result<Option<ProgressId>, StorageError> {
        match intent {
            WriteIntent::Create(record) => self.progress.create_progress(record).await.map(Some),
            WriteIntent::Update { id, update } => {
                self.progress.update_progress(id, &update).await.map(|()| None)
            }
        }
    }
}
