//! Term progress repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::error::StorageResult;
use quizhub_core::models::{TermProgress, TermProgressUpdate};
use quizhub_core::ports::ProgressRepository;

use super::database::Database;
use super::helpers::{query_error, transaction_error};

/// PostgreSQL implementation of ProgressRepository.
pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn get_term_progress(
        &self,
        user_id: Uuid,
        term_id: Uuid,
    ) -> StorageResult<Option<TermProgress>> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT id, term_id, user_id, timestamp,
                   term_correct_count, term_incorrect_count,
                   def_correct_count, def_incorrect_count,
                   term_leitner_system_box, def_leitner_system_box
            FROM term_progress
            WHERE user_id = $1 AND term_id = $2
            "#,
        )
        .bind(user_id)
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(ProgressRow::into_progress))
    }

    async fn apply_term_progress(
        &self,
        user_id: Uuid,
        updates: &[TermProgressUpdate],
    ) -> StorageResult<Vec<TermProgress>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(transaction_error)?;
        let mut applied = Vec::with_capacity(updates.len());

        for update in updates {
            // Counters add up; a box is replaced only when one is given.
            let row = sqlx::query_as::<_, ProgressRow>(
                r#"
                INSERT INTO term_progress (
                    term_id, user_id, timestamp,
                    term_correct_count, term_incorrect_count,
                    def_correct_count, def_incorrect_count,
                    term_leitner_system_box, def_leitner_system_box
                )
                VALUES ($1, $2, NOW(), $3, $4, $5, $6, $7, $8)
                ON CONFLICT (term_id, user_id) DO UPDATE SET
                    timestamp = NOW(),
                    term_correct_count = term_progress.term_correct_count + EXCLUDED.term_correct_count,
                    term_incorrect_count = term_progress.term_incorrect_count + EXCLUDED.term_incorrect_count,
                    def_correct_count = term_progress.def_correct_count + EXCLUDED.def_correct_count,
                    def_incorrect_count = term_progress.def_incorrect_count + EXCLUDED.def_incorrect_count,
                    term_leitner_system_box = COALESCE(EXCLUDED.term_leitner_system_box, term_progress.term_leitner_system_box),
                    def_leitner_system_box = COALESCE(EXCLUDED.def_leitner_system_box, term_progress.def_leitner_system_box)
                RETURNING id, term_id, user_id, timestamp,
                          term_correct_count, term_incorrect_count,
                          def_correct_count, def_incorrect_count,
                          term_leitner_system_box, def_leitner_system_box
                "#,
            )
            .bind(update.term_id)
            .bind(user_id)
            .bind(update.term_correct_increase)
            .bind(update.term_incorrect_increase)
            .bind(update.def_correct_increase)
            .bind(update.def_incorrect_increase)
            .bind(update.term_leitner_system_box)
            .bind(update.def_leitner_system_box)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_error)?;

            applied.push(row.into_progress());
        }

        tx.commit().await.map_err(transaction_error)?;

        Ok(applied)
    }
}

/// Database row representation for TermProgress.
#[derive(sqlx::FromRow)]
struct ProgressRow {
    id: Uuid,
    term_id: Uuid,
    user_id: Uuid,
    timestamp: DateTime<Utc>,
    term_correct_count: i32,
    term_incorrect_count: i32,
    def_correct_count: i32,
    def_incorrect_count: i32,
    term_leitner_system_box: Option<i32>,
    def_leitner_system_box: Option<i32>,
}

impl ProgressRow {
    fn into_progress(self) -> TermProgress {
        TermProgress {
            id: self.id,
            term_id: self.term_id,
            user_id: self.user_id,
            timestamp: self.timestamp,
            term_correct_count: self.term_correct_count,
            term_incorrect_count: self.term_incorrect_count,
            def_correct_count: self.def_correct_count,
            def_incorrect_count: self.def_incorrect_count,
            term_leitner_system_box: self.term_leitner_system_box,
            def_leitner_system_box: self.def_leitner_system_box,
        }
    }
}
