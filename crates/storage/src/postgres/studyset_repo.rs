//! Studyset repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::cursor::{RankedKey, RecencyKey};
use quizhub_core::error::StorageResult;
use quizhub_core::models::{RankedStudyset, Studyset, StudysetInput};
use quizhub_core::ports::StudysetRepository;

use super::database::Database;
use super::helpers::{limit_param, query_error};

/// PostgreSQL implementation of StudysetRepository.
pub struct PgStudysetRepository {
    pool: PgPool,
}

impl PgStudysetRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl StudysetRepository for PgStudysetRepository {
    async fn get_studyset(&self, id: Uuid) -> StorageResult<Option<Studyset>> {
        let row = sqlx::query_as::<_, StudysetRow>(
            r#"
            SELECT id, user_id, title, private, subject_id, created_at, updated_at
            FROM studysets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(StudysetRow::into_studyset))
    }

    async fn list_studysets_by_user(
        &self,
        user_id: Uuid,
        include_private: bool,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>> {
        let rows = sqlx::query_as::<_, StudysetRow>(
            r#"
            SELECT id, user_id, title, private, subject_id, created_at, updated_at
            FROM studysets
            WHERE user_id = $1
              AND ($2 OR NOT private)
              AND ($3::timestamptz IS NULL OR (updated_at, id) < ($3, $4::uuid))
            ORDER BY updated_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(include_private)
        .bind(after.map(|k| k.timestamp))
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(StudysetRow::into_studyset).collect())
    }

    async fn list_recent_studysets(
        &self,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>> {
        let rows = sqlx::query_as::<_, StudysetRow>(
            r#"
            SELECT id, user_id, title, private, subject_id, created_at, updated_at
            FROM studysets
            WHERE NOT private
              AND ($1::timestamptz IS NULL OR (updated_at, id) < ($1, $2::uuid))
            ORDER BY updated_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(after.map(|k| k.timestamp))
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(StudysetRow::into_studyset).collect())
    }

    async fn search_studysets(
        &self,
        query: &str,
        subject_id: Option<&str>,
        after: Option<&RankedKey>,
        limit: usize,
    ) -> StorageResult<Vec<RankedStudyset>> {
        // The score travels as text so the resumed query compares against the
        // exact float4 value it emitted.
        let rows = sqlx::query_as::<_, RankedRow>(
            r#"
            WITH ranked AS (
                SELECT s.id, s.user_id, s.title, s.private, s.subject_id,
                       s.created_at, s.updated_at,
                       ts_rank(s.tsvector, q) AS score
                FROM studysets s, websearch_to_tsquery('simple', $1) q
                WHERE NOT s.private
                  AND s.tsvector @@ q
                  AND ($2::text IS NULL OR s.subject_id = $2)
            )
            SELECT id, user_id, title, private, subject_id, created_at, updated_at,
                   score::text AS score
            FROM ranked
            WHERE $3::text IS NULL
               OR (score, updated_at, id) < ($3::text::real, $4::timestamptz, $5::uuid)
            ORDER BY score DESC, updated_at DESC, id DESC
            LIMIT $6
            "#,
        )
        .bind(query)
        .bind(subject_id)
        .bind(after.map(|k| k.score.as_str()))
        .bind(after.map(|k| k.timestamp))
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(RankedRow::into_ranked).collect())
    }

    async fn insert_studyset(
        &self,
        owner: Uuid,
        input: &StudysetInput,
    ) -> StorageResult<Studyset> {
        let row = sqlx::query_as::<_, StudysetRow>(
            r#"
            INSERT INTO studysets (user_id, title, private, subject_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, private, subject_id, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(&input.title)
        .bind(input.private)
        .bind(&input.subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.into_studyset())
    }

    async fn update_studyset(
        &self,
        id: Uuid,
        input: &StudysetInput,
    ) -> StorageResult<Option<Studyset>> {
        let row = sqlx::query_as::<_, StudysetRow>(
            r#"
            UPDATE studysets
            SET title = $2, private = $3, subject_id = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, title, private, subject_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(input.private)
        .bind(&input.subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(StudysetRow::into_studyset))
    }

    async fn delete_studyset(&self, id: Uuid) -> StorageResult<bool> {
        // Terms, memberships, saves, progress and practice tests cascade.
        let result = sqlx::query("DELETE FROM studysets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Database row representation for Studyset.
#[derive(sqlx::FromRow)]
pub(super) struct StudysetRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    private: bool,
    subject_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StudysetRow {
    pub(super) fn into_studyset(self) -> Studyset {
        Studyset {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            private: self.private,
            subject_id: self.subject_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RankedRow {
    #[sqlx(flatten)]
    studyset: StudysetRow,
    score: String,
}

impl RankedRow {
    fn into_ranked(self) -> RankedStudyset {
        RankedStudyset {
            studyset: self.studyset.into_studyset(),
            score: self.score,
        }
    }
}
