//! Saved studyset repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::cursor::RecencyKey;
use quizhub_core::error::StorageResult;
use quizhub_core::models::SavedStudyset;
use quizhub_core::ports::SavedStudysetRepository;

use super::database::Database;
use super::helpers::{limit_param, query_error};
use super::studyset_repo::StudysetRow;

/// PostgreSQL implementation of SavedStudysetRepository.
pub struct PgSavedStudysetRepository {
    pool: PgPool,
}

impl PgSavedStudysetRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl SavedStudysetRepository for PgSavedStudysetRepository {
    async fn save_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO saved_studysets (user_id, studyset_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, studyset_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(studyset_id)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn unsave_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool> {
        let result =
            sqlx::query("DELETE FROM saved_studysets WHERE user_id = $1 AND studyset_id = $2")
                .bind(user_id)
                .bind(studyset_id)
                .execute(&self.pool)
                .await
                .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_saved(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM saved_studysets WHERE user_id = $1 AND studyset_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(studyset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.0)
    }

    async fn list_saved_studysets(
        &self,
        user_id: Uuid,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<SavedStudyset>> {
        let rows = sqlx::query_as::<_, SavedRow>(
            r#"
            SELECT ss.user_id AS saved_by, ss.saved_at,
                   s.id, s.user_id, s.title, s.private, s.subject_id,
                   s.created_at, s.updated_at
            FROM saved_studysets ss
            JOIN studysets s ON s.id = ss.studyset_id
            WHERE ss.user_id = $1
              AND ($2::timestamptz IS NULL OR (ss.saved_at, ss.studyset_id) < ($2, $3::uuid))
            ORDER BY ss.saved_at DESC, ss.studyset_id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(after.map(|k| k.timestamp))
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(SavedRow::into_saved).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SavedRow {
    saved_by: Uuid,
    saved_at: DateTime<Utc>,
    #[sqlx(flatten)]
    studyset: StudysetRow,
}

impl SavedRow {
    fn into_saved(self) -> SavedStudyset {
        SavedStudyset {
            user_id: self.saved_by,
            studyset: self.studyset.into_studyset(),
            saved_at: self.saved_at,
        }
    }
}
