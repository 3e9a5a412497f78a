use progress_core::model::{
    CategoryKey, ChapterKey, ContentType, FrqScoreEntry, McqScoreEntry, ProgressId,
    ProgressRecord, ProgressStatus, ScoreId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn progress_id_from_i64(v: i64) -> Result<ProgressId, StorageError> {
    Ok(ProgressId::new(i64_to_u64("progress_id", v)?))
}

pub(crate) fn score_id_from_i64(v: i64) -> Result<ScoreId, StorageError> {
    Ok(ScoreId::new(i64_to_u64("score_id", v)?))
}

fn keys(row: &SqliteRow) -> Result<(UserId, CategoryKey, ChapterKey), StorageError> {
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?);
    let category =
        CategoryKey::new(row.try_get::<String, _>("category").map_err(ser)?).map_err(ser)?;
    let chapter = ChapterKey::new(row.try_get::<String, _>("chapter").map_err(ser)?).map_err(ser)?;
    Ok((user_id, category, chapter))
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let (user_id, category, chapter) = keys(row)?;
    let content_type =
        ContentType::parse(&row.try_get::<String, _>("content_type").map_err(ser)?).map_err(ser)?;
    let progress =
        ProgressStatus::from_key(&row.try_get::<String, _>("progress").map_err(ser)?)
            .map_err(ser)?;

    Ok(ProgressRecord {
        id: progress_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        category,
        chapter,
        content_type,
        progress,
        user_id,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_mcq_row(row: &SqliteRow) -> Result<McqScoreEntry, StorageError> {
    let (user_id, category, chapter) = keys(row)?;
    Ok(McqScoreEntry {
        id: score_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        category,
        chapter,
        user_id,
        correct: i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        total: i64_to_u32("total", row.try_get("total").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_frq_row(row: &SqliteRow) -> Result<FrqScoreEntry, StorageError> {
    let (user_id, category, chapter) = keys(row)?;
    Ok(FrqScoreEntry {
        id: score_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        category,
        chapter,
        user_id,
        item: i64_to_u32("item", row.try_get("item").map_err(ser)?)?,
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        max_score: i64_to_u32("max_score", row.try_get("max_score").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
