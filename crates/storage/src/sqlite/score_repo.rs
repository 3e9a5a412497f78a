use progress_core::model::{
    CategoryScope, FrqScoreEntry, McqScoreEntry, NewFrqScore, NewMcqScore, ScoreId,
};

use super::SqliteRepository;
use super::mapping::{conn, map_frq_row, map_mcq_row, score_id_from_i64};
use crate::repository::{ScoreRepository, StorageError, authorize};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn append_mcq_score(&self, score: NewMcqScore) -> Result<ScoreId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO mcq_scores (user_id, category, chapter, correct, total, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(score.user_id.as_str())
        .bind(score.category.as_str())
        .bind(score.chapter.as_str())
        .bind(i64::from(score.correct))
        .bind(i64::from(score.total))
        .bind(score.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        score_id_from_i64(res.last_insert_rowid())
    }

    async fn append_frq_score(&self, score: NewFrqScore) -> Result<ScoreId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO frq_scores (user_id, category, chapter, item, score, max_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(score.user_id.as_str())
        .bind(score.category.as_str())
        .bind(score.chapter.as_str())
        .bind(i64::from(score.item))
        .bind(i64::from(score.score))
        .bind(i64::from(score.max_score))
        .bind(score.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        score_id_from_i64(res.last_insert_rowid())
    }

    async fn mcq_scores(&self, scope: &CategoryScope) -> Result<Vec<McqScoreEntry>, StorageError> {
        authorize(&scope.token)?;
        let rows = sqlx::query(
            r"
            SELECT id, user_id, category, chapter, correct, total, created_at
            FROM mcq_scores
            WHERE user_id = ?1 AND category = ?2
            ORDER BY id ASC
            ",
        )
        .bind(scope.user_id.as_str())
        .bind(scope.category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_mcq_row).collect()
    }

    async fn frq_scores(&self, scope: &CategoryScope) -> Result<Vec<FrqScoreEntry>, StorageError> {
        authorize(&scope.token)?;
        let rows = sqlx::query(
            r"
            SELECT id, user_id, category, chapter, item, score, max_score, created_at
            FROM frq_scores
            WHERE user_id = ?1 AND category = ?2
            ORDER BY id ASC
            ",
        )
        .bind(scope.user_id.as_str())
        .bind(scope.category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_frq_row).collect()
    }
}
