use progress_core::model::{
    AuthToken, CategoryKey, CategoryScope, ChapterKey, ContentType, NewFrqScore, NewMcqScore,
    NewProgressRecord, ProgressId, ProgressKey, ProgressQuery, ProgressStatus, ProgressUpdate,
    UserId,
};
use progress_core::time::fixed_now;
use storage::repository::{ProgressRepository, ScoreRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn key(user: &str, chapter: &str) -> ProgressKey {
    ProgressKey::new(
        UserId::new(user),
        CategoryKey::new("micro").unwrap(),
        ChapterKey::new(chapter).unwrap(),
        ContentType::Slide,
    )
}

fn query(key: ProgressKey) -> ProgressQuery {
    ProgressQuery::new(key, AuthToken::new("tok"))
}

fn scope(user: &UserId, category: &CategoryKey) -> CategoryScope {
    CategoryScope::new(user.clone(), category.clone(), AuthToken::new("tok"))
}

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_progress_create_update_query() {
    let repo = repo("memdb_progress").await;
    let k = key("alice", "supply-and-demand");

    assert!(repo.query_progress(&query(k.clone())).await.unwrap().is_empty());

    let id = repo
        .create_progress(NewProgressRecord::for_key(
            &k,
            ProgressStatus::InProgress,
            fixed_now(),
        ))
        .await
        .unwrap();

    let later = fixed_now() + chrono::Duration::minutes(3);
    repo.update_progress(
        id,
        &ProgressUpdate {
            progress: ProgressStatus::Completed,
            created_at: later,
        },
    )
    .await
    .unwrap();

    let records = repo.query_progress(&query(k)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].progress, ProgressStatus::Completed);
    assert_eq!(records[0].created_at, later);

    let other_user = repo
        .query_progress(&query(key("bob", "supply-and-demand")))
        .await
        .unwrap();
    assert!(other_user.is_empty());
}

#[tokio::test]
async fn sqlite_duplicates_come_back_oldest_first() {
    let repo = repo("memdb_duplicates").await;
    let k = key("alice", "factor-markets");

    let first = repo
        .create_progress(NewProgressRecord::for_key(
            &k,
            ProgressStatus::Completed,
            fixed_now(),
        ))
        .await
        .unwrap();
    repo.create_progress(NewProgressRecord::for_key(
        &k,
        ProgressStatus::InProgress,
        fixed_now(),
    ))
    .await
    .unwrap();

    let records = repo.query_progress(&query(k)).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, first);
    assert_eq!(records[0].progress, ProgressStatus::Completed);
}

#[tokio::test]
async fn sqlite_update_missing_record_is_not_found() {
    let repo = repo("memdb_missing").await;
    let err = repo
        .update_progress(
            ProgressId::new(404),
            &ProgressUpdate {
                progress: ProgressStatus::Completed,
                created_at: fixed_now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_scores_are_scoped_by_user_and_category() {
    let repo = repo("memdb_scores").await;
    let micro = CategoryKey::new("micro").unwrap();
    let macro_ = CategoryKey::new("macro").unwrap();
    let chapter = ChapterKey::new("supply-and-demand").unwrap();
    let alice = UserId::new("alice");

    for item in 1..=2 {
        repo.append_frq_score(
            NewFrqScore::new(
                micro.clone(),
                chapter.clone(),
                alice.clone(),
                item,
                3,
                5,
                fixed_now(),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    }
    repo.append_frq_score(
        NewFrqScore::new(
            macro_.clone(),
            chapter.clone(),
            alice.clone(),
            1,
            5,
            5,
            fixed_now(),
        )
        .unwrap(),
    )
    .await
    .unwrap();
    repo.append_mcq_score(
        NewMcqScore::new(micro.clone(), chapter.clone(), alice.clone(), 8, 10, fixed_now()).unwrap(),
    )
    .await
    .unwrap();

    let frqs = repo.frq_scores(&scope(&alice, &micro)).await.unwrap();
    assert_eq!(frqs.len(), 2);
    assert_eq!(frqs[1].item, 2);

    let mcqs = repo.mcq_scores(&scope(&alice, &micro)).await.unwrap();
    assert_eq!(mcqs.len(), 1);
    assert_eq!(mcqs[0].correct, 8);

    assert!(
        repo.mcq_scores(&scope(&UserId::new("bob"), &micro))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn sqlite_reads_require_a_token() {
    let repo = repo("memdb_unauthorized").await;
    let anonymous = ProgressQuery::new(key("alice", "supply-and-demand"), AuthToken::new(""));
    let err = repo.query_progress(&anonymous).await.unwrap_err();
    assert!(matches!(err, StorageError::Unauthorized));
}
