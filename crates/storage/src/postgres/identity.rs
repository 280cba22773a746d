//! Session-token identity provider backed by `auth.sessions`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use quizhub_core::access::Identity;
use quizhub_core::error::StorageResult;
use quizhub_core::ports::IdentityProvider;

use super::database::Database;
use super::helpers::query_error;

/// Resolves bearer tokens against unexpired rows of `auth.sessions`.
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    #[instrument(skip_all)]
    async fn resolve(&self, bearer: Option<&str>) -> StorageResult<Identity> {
        let Some(token) = bearer.filter(|t| !t.is_empty()) else {
            return Ok(Identity::Anonymous);
        };

        let row: Option<(Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT u.id, u.mod_perms
            FROM auth.sessions s
            JOIN auth.users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expire_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(match row {
            Some((user_id, is_moderator)) => Identity::Authenticated {
                user_id,
                is_moderator,
            },
            None => Identity::Anonymous,
        })
    }
}
