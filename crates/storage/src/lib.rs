//! Storage layer for Quizhub.
//!
//! This crate provides implementations of the repository ports defined in
//! `quizhub-core`:
//!
//! - [`postgres`] - PostgreSQL adapters, connection pooling and migrations
//! - [`memory`] - an in-process adapter with the same ordering and keyset
//!   semantics, for tests and ephemeral servers
//!
//! Both adapters also implement [`quizhub_core::ports::IdentityProvider`].
//!
//! # Usage
//!
//! ```ignore
//! use quizhub_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepositories;
pub use postgres::{Database, DatabaseConfig, PgIdentityProvider, PgRepositories};
