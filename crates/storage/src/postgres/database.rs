//! PostgreSQL pool, schema migrations and session housekeeping.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use quizhub_core::error::{StorageError, StorageResult};

use super::helpers::query_error;

/// Pool settings for the content and session store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Requests waiting longer than this for a connection fail with
    /// `StorageError::Timeout`.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// Settings for the GraphQL API: short acquire timeout so a saturated
    /// pool surfaces as `INTERNAL_ERROR` instead of a hung request.
    pub fn for_api(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 15,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(900),
        }
    }
}

/// Shared handle on the Quizhub database.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip_all, fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!(
            acquire_timeout_secs = config.acquire_timeout.as_secs(),
            "Content store pool ready"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bring the `auth` and content schemas up to date.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        let migrator = sqlx::migrate!("./migrations");
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!(known = migrator.iter().count(), "Schema up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Delete sessions whose expiry has passed.
    ///
    /// Returns the number of sessions removed.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM auth.sessions WHERE expire_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        debug!(removed = result.rows_affected(), "Expired sessions removed");

        Ok(result.rows_affected())
    }
}
