use progress_core::model::{
    CategoryScope, ContentType, NewProgressRecord, ProgressId, ProgressQuery, ProgressRecord,
    ProgressUpdate,
};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_progress_row, progress_id_from_i64};
use crate::repository::{ProgressRepository, StorageError, authorize};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn query_progress(
        &self,
        query: &ProgressQuery,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        authorize(&query.token)?;
        let key = &query.key;
        let rows = sqlx::query(
            r"
            SELECT id, user_id, category, chapter, content_type, progress, created_at
            FROM progress
            WHERE user_id = ?1 AND category = ?2 AND chapter = ?3 AND content_type = ?4
            ORDER BY id ASC
            ",
        )
        .bind(key.user_id.as_str())
        .bind(key.category.as_str())
        .bind(key.chapter.as_str())
        .bind(key.content_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_progress(
        &self,
        scope: &CategoryScope,
        content_type: ContentType,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        authorize(&scope.token)?;
        let rows = sqlx::query(
            r"
            SELECT id, user_id, category, chapter, content_type, progress, created_at
            FROM progress
            WHERE user_id = ?1 AND category = ?2 AND content_type = ?3
            ORDER BY id ASC
            ",
        )
        .bind(scope.user_id.as_str())
        .bind(scope.category.as_str())
        .bind(content_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<ProgressId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO progress (user_id, category, chapter, content_type, progress, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(record.user_id.as_str())
        .bind(record.category.as_str())
        .bind(record.chapter.as_str())
        .bind(record.content_type.as_str())
        .bind(record.progress.key())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        progress_id_from_i64(res.last_insert_rowid())
    }

    async fn update_progress(
        &self,
        id: ProgressId,
        update: &ProgressUpdate,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE progress
            SET progress = ?2, created_at = ?3
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("progress_id", id.value())?)
        .bind(update.progress.key())
        .bind(update.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
