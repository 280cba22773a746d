//! Folder repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::cursor::IdKey;
use quizhub_core::error::StorageResult;
use quizhub_core::models::{Folder, Studyset};
use quizhub_core::ports::FolderRepository;

use super::database::Database;
use super::helpers::{limit_param, query_error};
use super::studyset_repo::StudysetRow;

/// PostgreSQL implementation of FolderRepository.
pub struct PgFolderRepository {
    pool: PgPool,
}

impl PgFolderRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl FolderRepository for PgFolderRepository {
    async fn get_folder(&self, id: Uuid) -> StorageResult<Option<Folder>> {
        let row = sqlx::query_as::<_, FolderRow>(
            "SELECT id, user_id, name FROM folders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(FolderRow::into_folder))
    }

    async fn list_folders_by_user(
        &self,
        user_id: Uuid,
        after: Option<&IdKey>,
        limit: usize,
    ) -> StorageResult<Vec<Folder>> {
        let rows = sqlx::query_as::<_, FolderRow>(
            r#"
            SELECT id, user_id, name
            FROM folders
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(after.map(|k| k.id))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(FolderRow::into_folder).collect())
    }

    async fn insert_folder(&self, user_id: Uuid, name: &str) -> StorageResult<Folder> {
        let row = sqlx::query_as::<_, FolderRow>(
            "INSERT INTO folders (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.into_folder())
    }

    async fn rename_folder(&self, id: Uuid, name: &str) -> StorageResult<Option<Folder>> {
        let row = sqlx::query_as::<_, FolderRow>(
            "UPDATE folders SET name = $2 WHERE id = $1 RETURNING id, user_id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(FolderRow::into_folder))
    }

    async fn delete_folder(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
        folder_id: Uuid,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO folder_studysets (user_id, studyset_id, folder_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, studyset_id) DO UPDATE SET
                folder_id = EXCLUDED.folder_id
            "#,
        )
        .bind(user_id)
        .bind(studyset_id)
        .bind(folder_id)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn remove_studyset_from_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<bool> {
        let result =
            sqlx::query("DELETE FROM folder_studysets WHERE user_id = $1 AND studyset_id = $2")
                .bind(user_id)
                .bind(studyset_id)
                .execute(&self.pool)
                .await
                .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<Option<Folder>> {
        let row = sqlx::query_as::<_, FolderRow>(
            r#"
            SELECT f.id, f.user_id, f.name
            FROM folder_studysets fs
            JOIN folders f ON f.id = fs.folder_id
            WHERE fs.user_id = $1 AND fs.studyset_id = $2
            "#,
        )
        .bind(user_id)
        .bind(studyset_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(FolderRow::into_folder))
    }

    async fn list_folder_studysets(&self, folder_id: Uuid) -> StorageResult<Vec<Studyset>> {
        let rows = sqlx::query_as::<_, StudysetRow>(
            r#"
            SELECT s.id, s.user_id, s.title, s.private, s.subject_id,
                   s.created_at, s.updated_at
            FROM folder_studysets fs
            JOIN studysets s ON s.id = fs.studyset_id
            WHERE fs.folder_id = $1
            ORDER BY s.updated_at DESC, s.id DESC
            "#,
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(rows.into_iter().map(StudysetRow::into_studyset).collect())
    }
}

/// Database row representation for Folder.
#[derive(sqlx::FromRow)]
struct FolderRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
}

impl FolderRow {
    fn into_folder(self) -> Folder {
        Folder {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
        }
    }
}
