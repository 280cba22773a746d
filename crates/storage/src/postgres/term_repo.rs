//! Term repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::error::StorageResult;
use quizhub_core::models::{NewTerm, Term, TermUpdate};
use quizhub_core::ports::TermRepository;

use super::database::Database;
use super::helpers::{query_error, transaction_error};

/// PostgreSQL implementation of TermRepository.
pub struct PgTermRepository {
    pool: PgPool,
}

impl PgTermRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl TermRepository for PgTermRepository {
    async fn get_term(&self, id: Uuid) -> StorageResult<Option<Term>> {
        let row = sqlx::query_as::<_, TermRow>(
            r#"
            SELECT id, studyset_id, term, def, sort_order, created_at, updated_at
            FROM terms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(TermRow::into_term))
    }

    async fn list_terms(&self, studyset_id: Uuid) -> StorageResult<Vec<Term>> {
        let rows = sqlx::query_as::<_, TermRow>(
            r#"
            SELECT id, studyset_id, term, def, sort_order, created_at, updated_at
            FROM terms
            WHERE studyset_id = $1
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(studyset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(TermRow::into_term).collect())
    }

    async fn count_terms(&self, studyset_id: Uuid) -> StorageResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM terms WHERE studyset_id = $1")
            .bind(studyset_id)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(row.0)
    }

    async fn insert_terms(
        &self,
        studyset_id: Uuid,
        terms: &[NewTerm],
    ) -> StorageResult<Vec<Term>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(transaction_error)?;
        let mut created = Vec::with_capacity(terms.len());

        for term in terms {
            let row = sqlx::query_as::<_, TermRow>(
                r#"
                INSERT INTO terms (studyset_id, term, def, sort_order)
                VALUES ($1, $2, $3, $4)
                RETURNING id, studyset_id, term, def, sort_order, created_at, updated_at
                "#,
            )
            .bind(studyset_id)
            .bind(&term.term)
            .bind(&term.def)
            .bind(term.sort_order)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_error)?;

            created.push(row.into_term());
        }

        touch_studyset(&mut tx, studyset_id).await?;
        tx.commit().await.map_err(transaction_error)?;

        Ok(created)
    }

    async fn update_terms(
        &self,
        studyset_id: Uuid,
        updates: &[TermUpdate],
    ) -> StorageResult<Vec<Term>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(transaction_error)?;
        let mut updated = Vec::with_capacity(updates.len());

        for update in updates {
            let row = sqlx::query_as::<_, TermRow>(
                r#"
                UPDATE terms
                SET term = COALESCE($3, term),
                    def = COALESCE($4, def),
                    sort_order = COALESCE($5, sort_order),
                    updated_at = NOW()
                WHERE id = $1 AND studyset_id = $2
                RETURNING id, studyset_id, term, def, sort_order, created_at, updated_at
                "#,
            )
            .bind(update.id)
            .bind(studyset_id)
            .bind(&update.term)
            .bind(&update.def)
            .bind(update.sort_order)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_error)?;

            if let Some(row) = row {
                updated.push(row.into_term());
            }
        }

        touch_studyset(&mut tx, studyset_id).await?;
        tx.commit().await.map_err(transaction_error)?;

        Ok(updated)
    }

    async fn delete_terms(&self, studyset_id: Uuid, ids: &[Uuid]) -> StorageResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(transaction_error)?;

        let deleted: Vec<(Uuid,)> = sqlx::query_as(
            "DELETE FROM terms WHERE studyset_id = $1 AND id = ANY($2) RETURNING id",
        )
        .bind(studyset_id)
        .bind(ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(query_error)?;

        touch_studyset(&mut tx, studyset_id).await?;
        tx.commit().await.map_err(transaction_error)?;

        Ok(deleted.into_iter().map(|(id,)| id).collect())
    }
}

/// Editing terms counts as editing the studyset.
async fn touch_studyset(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    studyset_id: Uuid,
) -> StorageResult<()> {
    sqlx::query("UPDATE studysets SET updated_at = NOW() WHERE id = $1")
        .bind(studyset_id)
        .execute(&mut **tx)
        .await
        .map_err(query_error)?;
    Ok(())
}

/// Database row representation for Term.
#[derive(sqlx::FromRow)]
struct TermRow {
    id: Uuid,
    studyset_id: Uuid,
    term: String,
    def: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TermRow {
    fn into_term(self) -> Term {
        Term {
            id: self.id,
            studyset_id: self.studyset_id,
            term: self.term,
            def: self.def,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
