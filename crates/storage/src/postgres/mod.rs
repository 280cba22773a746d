//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `quizhub-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool, migrations and session cleanup
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual repos: `PgStudysetRepository`, `PgTermRepository`, etc.
//! - [`PgIdentityProvider`] - Bearer token lookup against `auth.sessions`
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(Arc::new(db));
//! ```

mod database;
mod folder_repo;
mod helpers;
mod identity;
mod practice_test_repo;
mod progress_repo;
mod saved_repo;
mod studyset_repo;
mod term_repo;
mod user_repo;

pub use database::{Database, DatabaseConfig};
pub use folder_repo::PgFolderRepository;
pub use identity::PgIdentityProvider;
pub use practice_test_repo::PgPracticeTestRepository;
pub use progress_repo::PgProgressRepository;
pub use saved_repo::PgSavedStudysetRepository;
pub use studyset_repo::PgStudysetRepository;
pub use term_repo::PgTermRepository;
pub use user_repo::PgUserRepository;

use std::sync::Arc;

use quizhub_core::ports::{
    FolderRepository, PracticeTestRepository, ProgressRepository, Repositories,
    SavedStudysetRepository, StudysetRepository, TermRepository, UserRepository,
};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
pub struct PgRepositories {
    db: Arc<Database>,
    studysets: PgStudysetRepository,
    terms: PgTermRepository,
    folders: PgFolderRepository,
    progress: PgProgressRepository,
    practice_tests: PgPracticeTestRepository,
    saved: PgSavedStudysetRepository,
    users: PgUserRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            studysets: PgStudysetRepository::new(&db),
            terms: PgTermRepository::new(&db),
            folders: PgFolderRepository::new(&db),
            progress: PgProgressRepository::new(&db),
            practice_tests: PgPracticeTestRepository::new(&db),
            saved: PgSavedStudysetRepository::new(&db),
            users: PgUserRepository::new(&db),
            db,
        }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Repositories for PgRepositories {
    fn studysets(&self) -> &dyn StudysetRepository {
        &self.studysets
    }

    fn terms(&self) -> &dyn TermRepository {
        &self.terms
    }

    fn folders(&self) -> &dyn FolderRepository {
        &self.folders
    }

    fn progress(&self) -> &dyn ProgressRepository {
        &self.progress
    }

    fn practice_tests(&self) -> &dyn PracticeTestRepository {
        &self.practice_tests
    }

    fn saved(&self) -> &dyn SavedStudysetRepository {
        &self.saved
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }
}
