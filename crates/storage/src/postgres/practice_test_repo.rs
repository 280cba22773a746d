//! Practice test repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::cursor::RecencyKey;
use quizhub_core::error::StorageResult;
use quizhub_core::models::{NewPracticeTest, PracticeTest, PracticeTestUpdate};
use quizhub_core::ports::PracticeTestRepository;

use super::database::Database;
use super::helpers::{limit_param, query_error};

/// PostgreSQL implementation of PracticeTestRepository.
pub struct PgPracticeTestRepository {
    pool: PgPool,
}

impl PgPracticeTestRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl PracticeTestRepository for PgPracticeTestRepository {
    async fn get_practice_test(&self, id: Uuid) -> StorageResult<Option<PracticeTest>> {
        let row = sqlx::query_as::<_, PracticeTestRow>(
            r#"
            SELECT id, studyset_id, user_id, timestamp,
                   questions_correct, questions_total, questions
            FROM practice_tests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(PracticeTestRow::into_practice_test))
    }

    async fn list_practice_tests(
        &self,
        user_id: Uuid,
        studyset_id: Option<Uuid>,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<PracticeTest>> {
        let rows = sqlx::query_as::<_, PracticeTestRow>(
            r#"
            SELECT id, studyset_id, user_id, timestamp,
                   questions_correct, questions_total, questions
            FROM practice_tests
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR studyset_id = $2)
              AND ($3::timestamptz IS NULL OR (timestamp, id) < ($3, $4::uuid))
            ORDER BY timestamp DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(studyset_id)
        .bind(after.map(|k| k.timestamp))
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows
            .into_iter()
            .map(PracticeTestRow::into_practice_test)
            .collect())
    }

    async fn insert_practice_test(
        &self,
        user_id: Uuid,
        test: &NewPracticeTest,
    ) -> StorageResult<PracticeTest> {
        let row = sqlx::query_as::<_, PracticeTestRow>(
            r#"
            INSERT INTO practice_tests (
                studyset_id, user_id, timestamp,
                questions_correct, questions_total, questions
            )
            VALUES ($1, $2, NOW(), $3, $4, $5)
            RETURNING id, studyset_id, user_id, timestamp,
                      questions_correct, questions_total, questions
            "#,
        )
        .bind(test.studyset_id)
        .bind(user_id)
        .bind(test.questions_correct)
        .bind(test.questions_total)
        .bind(&test.questions)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.into_practice_test())
    }

    async fn update_practice_test(
        &self,
        update: &PracticeTestUpdate,
    ) -> StorageResult<Option<PracticeTest>> {
        let row = sqlx::query_as::<_, PracticeTestRow>(
            r#"
            UPDATE practice_tests
            SET questions_correct = $2, questions_total = $3, questions = $4
            WHERE id = $1
            RETURNING id, studyset_id, user_id, timestamp,
                      questions_correct, questions_total, questions
            "#,
        )
        .bind(update.id)
        .bind(update.questions_correct)
        .bind(update.questions_total)
        .bind(&update.questions)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(PracticeTestRow::into_practice_test))
    }
}

/// Database row representation for PracticeTest.
#[derive(sqlx::FromRow)]
struct PracticeTestRow {
    id: Uuid,
    studyset_id: Uuid,
    user_id: Uuid,
    timestamp: DateTime<Utc>,
    questions_correct: i32,
    questions_total: i32,
    questions: serde_json::Value,
}

impl PracticeTestRow {
    fn into_practice_test(self) -> PracticeTest {
        PracticeTest {
            id: self.id,
            studyset_id: self.studyset_id,
            user_id: self.user_id,
            timestamp: self.timestamp,
            questions_correct: self.questions_correct,
            questions_total: self.questions_total,
            questions: self.questions,
        }
    }
}
