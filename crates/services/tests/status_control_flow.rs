use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use progress_core::model::{
    AuthToken, CategoryScope, ContentType, NewProgressRecord, ProgressId, ProgressKey,
    ProgressPath, ProgressQuery, ProgressRecord, ProgressStatus, ProgressUpdate, UserId,
};
use progress_core::time::{fixed_clock, fixed_now};
use services::{
    FetchState, Identity, ProgressFetcher, SelectOutcome, StaticIdentity, StatusControlService,
    StatusSyncError,
};
use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};
use tokio::sync::Notify;

/// Wraps the in-memory store and counts every call that reaches it.
#[derive(Default)]
struct CountingRepository {
    inner: InMemoryRepository,
    reads: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    hold_creates: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl CountingRepository {
    fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes()
    }
}

#[async_trait]
impl ProgressRepository for CountingRepository {
    async fn query_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        self.inner.query_progress(query).await
    }

    async fn list_progress(
        &self,
        scope: &CategoryScope,
        content_type: ContentType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_progress(scope, content_type).await
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<ProgressId, StorageError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.hold_creates.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        self.inner.create_progress(record).await
    }

    async fn update_progress(
        &self,
        id: ProgressId,
        update: &ProgressUpdate,
    ) -> Result<(), StorageError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        self.inner.update_progress(id, update).await
    }
}

fn path() -> ProgressPath {
    ProgressPath::parse("micro/supply-and-demand/slide").unwrap()
}

fn key() -> ProgressKey {
    path().for_user(UserId::new("alice"))
}

fn query() -> ProgressQuery {
    ProgressQuery::new(key(), AuthToken::new("tok"))
}

fn signed_in() -> StaticIdentity {
    StaticIdentity::signed_in(Identity::new(UserId::new("alice"), AuthToken::new("tok")))
}

fn service(repo: &Arc<CountingRepository>, identity: StaticIdentity) -> StatusControlService {
    let progress: Arc<dyn ProgressRepository> = repo.clone();
    StatusControlService::new(
        fixed_clock(),
        Arc::clone(&progress),
        ProgressFetcher::new(progress),
        Arc::new(identity),
    )
}

#[tokio::test]
async fn selecting_creates_once_then_updates_the_same_record() {
    let repo = Arc::new(CountingRepository::default());
    let service = service(&repo, signed_in());
    let session = service.mount(path()).await.unwrap();
    assert_eq!(session.displayed(), Some(ProgressStatus::NotStarted));

    let outcome = service
        .select(&session, ProgressStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Synced(ProgressStatus::InProgress));
    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
    assert_eq!(repo.updates.load(Ordering::SeqCst), 0);
    let id = session.record_id().expect("record id after create");

    let outcome = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Synced(ProgressStatus::Completed));
    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
    assert_eq!(repo.updates.load(Ordering::SeqCst), 1);
    assert_eq!(session.record_id(), Some(id));

    let outcome = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Unchanged);
    assert_eq!(repo.writes(), 2);

    let stored = repo.inner.query_progress(&query()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].progress, ProgressStatus::Completed);
}

#[tokio::test]
async fn reselecting_the_current_status_never_writes() {
    for status in ProgressStatus::ALL {
        let repo = Arc::new(CountingRepository::default());
        if status != ProgressStatus::NotStarted {
            repo.inner
                .create_progress(NewProgressRecord::for_key(&key(), status, fixed_now()))
                .await
                .unwrap();
        }
        let service = service(&repo, signed_in());
        let session = service.mount(path()).await.unwrap();
        assert_eq!(session.displayed(), Some(status));

        let outcome = service.select(&session, status).await.unwrap();
        assert_eq!(outcome, SelectOutcome::Unchanged);
        assert_eq!(repo.writes(), 0);
    }
}

#[tokio::test]
async fn without_identity_nothing_is_requested() {
    let repo = Arc::new(CountingRepository::default());
    let service = service(&repo, StaticIdentity::anonymous());
    let session = service.mount(path()).await.unwrap();

    assert!(session.is_suspended());
    assert_eq!(session.fetch_state(), FetchState::Suspended);
    assert!(!session.poll_delivery());
    assert_eq!(session.displayed(), None);
    assert!(session.options().is_empty());
    assert_eq!(
        service
            .select(&session, ProgressStatus::Completed)
            .await
            .unwrap(),
        SelectOutcome::Suspended
    );
    assert_eq!(service.refresh(&session).await.unwrap(), None);
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn first_of_several_records_is_authoritative() {
    let repo = Arc::new(CountingRepository::default());
    let first = repo
        .inner
        .create_progress(NewProgressRecord::for_key(
            &key(),
            ProgressStatus::Completed,
            fixed_now(),
        ))
        .await
        .unwrap();
    repo.inner
        .create_progress(NewProgressRecord::for_key(
            &key(),
            ProgressStatus::InProgress,
            fixed_now(),
        ))
        .await
        .unwrap();

    let service = service(&repo, signed_in());
    let session = service.mount(path()).await.unwrap();
    assert_eq!(session.displayed(), Some(ProgressStatus::Completed));
    assert_eq!(session.duplicates(), 1);

    service
        .select(&session, ProgressStatus::NotStarted)
        .await
        .unwrap();
    assert_eq!(repo.creates.load(Ordering::SeqCst), 0);
    let stored = repo.inner.query_progress(&query()).await.unwrap();
    assert_eq!(stored[0].id, first);
    assert_eq!(stored[0].progress, ProgressStatus::NotStarted);
}

#[tokio::test]
async fn failed_write_is_reverted_by_the_reread() {
    let repo = Arc::new(CountingRepository::default());
    let service = service(&repo, signed_in());
    let session = service.mount(path()).await.unwrap();
    let reads = repo.reads.load(Ordering::SeqCst);

    repo.fail_writes.store(true, Ordering::SeqCst);
    let err = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, StatusSyncError::Write(StorageError::Connection(_))));
    assert_eq!(repo.reads.load(Ordering::SeqCst), reads + 1);
    assert_eq!(session.displayed(), Some(ProgressStatus::NotStarted));
    assert!(!session.is_diverged());

    repo.fail_writes.store(false, Ordering::SeqCst);
    let outcome = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Synced(ProgressStatus::Completed));
    assert_eq!(repo.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_write_diverges_while_reads_fail() {
    let repo = Arc::new(CountingRepository::default());
    let service = service(&repo, signed_in());
    let session = service.mount(path()).await.unwrap();

    repo.fail_writes.store(true, Ordering::SeqCst);
    repo.fail_reads.store(true, Ordering::SeqCst);
    let err = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, StatusSyncError::Write(StorageError::Connection(_))));
    assert_eq!(session.displayed(), Some(ProgressStatus::Completed));
    assert!(session.is_diverged());

    repo.fail_writes.store(false, Ordering::SeqCst);
    repo.fail_reads.store(false, Ordering::SeqCst);
    let status = service.refresh(&session).await.unwrap();
    assert_eq!(status, Some(ProgressStatus::NotStarted));
    assert!(!session.is_diverged());
}

#[tokio::test]
async fn external_changes_arrive_through_the_fetch_layer() {
    let repo = Arc::new(CountingRepository::default());
    let progress: Arc<dyn ProgressRepository> = repo.clone();
    let fetcher = ProgressFetcher::new(Arc::clone(&progress));
    let service = StatusControlService::new(
        fixed_clock(),
        progress,
        fetcher.clone(),
        Arc::new(signed_in()),
    );
    let session = service.mount(path()).await.unwrap();
    assert!(!session.poll_delivery());

    repo.inner
        .create_progress(NewProgressRecord::for_key(
            &key(),
            ProgressStatus::InProgress,
            fixed_now(),
        ))
        .await
        .unwrap();
    fetcher.refresh(&query()).await.unwrap();

    assert!(session.poll_delivery());
    assert_eq!(session.displayed(), Some(ProgressStatus::InProgress));
}

#[tokio::test]
async fn selections_during_a_write_are_sent_afterwards() {
    let repo = Arc::new(CountingRepository::default());
    repo.hold_creates.store(true, Ordering::SeqCst);
    let service = service(&repo, signed_in());
    let session = service.mount(path()).await.unwrap();

    let pending = {
        let service = service.clone();
        let session = session.clone();
        tokio::spawn(async move { service.select(&session, ProgressStatus::InProgress).await })
    };
    repo.entered.notified().await;

    let queued = service
        .select(&session, ProgressStatus::Completed)
        .await
        .unwrap();
    assert_eq!(queued, SelectOutcome::Queued);
    assert_eq!(repo.writes(), 1);

    repo.release.notify_one();
    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, SelectOutcome::Synced(ProgressStatus::Completed));
    assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
    assert_eq!(repo.updates.load(Ordering::SeqCst), 1);

    let stored = repo.inner.query_progress(&query()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].progress, ProgressStatus::Completed);
}
