//! User repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use quizhub_core::error::StorageResult;
use quizhub_core::models::User;
use quizhub_core::ports::UserRepository;

use super::database::Database;
use super::helpers::query_error;

/// PostgreSQL implementation of UserRepository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, mod_perms FROM auth.users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(UserRow::into_user))
    }
}

/// Database row representation for User.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: Option<String>,
    mod_perms: bool,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            is_moderator: self.mod_perms,
        }
    }
}
