//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `quizhub-storage`).
//!
//! Repositories never perform authorization. List methods return rows
//! already sorted and strictly past the `after` position, at most `limit`
//! of them; callers pass `page size + 1` to detect a next page.

use async_trait::async_trait;
use uuid::Uuid;

use crate::cursor::{IdKey, RankedKey, RecencyKey};
use crate::error::StorageResult;
use crate::models::{
    Folder, NewPracticeTest, NewTerm, PracticeTest, PracticeTestUpdate, RankedStudyset,
    SavedStudyset, Studyset, StudysetInput, Term, TermProgress, TermProgressUpdate, TermUpdate,
    User,
};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for studysets.
#[async_trait]
pub trait StudysetRepository: Send + Sync {
    /// Get studyset by ID.
    async fn get_studyset(&self, id: Uuid) -> StorageResult<Option<Studyset>>;

    /// List a user's studysets, `updated_at DESC, id DESC`.
    ///
    /// Private rows are candidates only when `include_private` is set.
    async fn list_studysets_by_user(
        &self,
        user_id: Uuid,
        include_private: bool,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>>;

    /// List public studysets of every user, `updated_at DESC, id DESC`.
    async fn list_recent_studysets(
        &self,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>>;

    /// Ranked keyword search over public studysets,
    /// `score DESC, updated_at DESC, id DESC`.
    async fn search_studysets(
        &self,
        query: &str,
        subject_id: Option<&str>,
        after: Option<&RankedKey>,
        limit: usize,
    ) -> StorageResult<Vec<RankedStudyset>>;

    /// Insert a new studyset owned by `owner`.
    async fn insert_studyset(&self, owner: Uuid, input: &StudysetInput)
        -> StorageResult<Studyset>;

    /// Replace title, privacy and subject; bumps `updated_at`.
    async fn update_studyset(
        &self,
        id: Uuid,
        input: &StudysetInput,
    ) -> StorageResult<Option<Studyset>>;

    /// Delete a studyset and everything that hangs off it.
    async fn delete_studyset(&self, id: Uuid) -> StorageResult<bool>;
}

/// Repository for terms.
#[async_trait]
pub trait TermRepository: Send + Sync {
    /// Get term by ID.
    async fn get_term(&self, id: Uuid) -> StorageResult<Option<Term>>;

    /// All terms of a studyset, `sort_order ASC, id ASC`.
    async fn list_terms(&self, studyset_id: Uuid) -> StorageResult<Vec<Term>>;

    async fn count_terms(&self, studyset_id: Uuid) -> StorageResult<i64>;

    /// Insert a batch of terms, returned in input order.
    async fn insert_terms(&self, studyset_id: Uuid, terms: &[NewTerm])
        -> StorageResult<Vec<Term>>;

    /// Update terms that belong to `studyset_id`; other ids are skipped.
    async fn update_terms(
        &self,
        studyset_id: Uuid,
        updates: &[TermUpdate],
    ) -> StorageResult<Vec<Term>>;

    /// Delete terms that belong to `studyset_id`, returning the deleted ids.
    async fn delete_terms(&self, studyset_id: Uuid, ids: &[Uuid]) -> StorageResult<Vec<Uuid>>;
}

/// Repository for folders and folder membership.
///
/// Membership is keyed by `(user_id, studyset_id)`: a user files a studyset
/// into at most one of their folders.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Get folder by ID.
    async fn get_folder(&self, id: Uuid) -> StorageResult<Option<Folder>>;

    /// List a user's folders, `id ASC`.
    async fn list_folders_by_user(
        &self,
        user_id: Uuid,
        after: Option<&IdKey>,
        limit: usize,
    ) -> StorageResult<Vec<Folder>>;

    async fn insert_folder(&self, user_id: Uuid, name: &str) -> StorageResult<Folder>;

    async fn rename_folder(&self, id: Uuid, name: &str) -> StorageResult<Option<Folder>>;

    /// Delete a folder; its memberships go with it.
    async fn delete_folder(&self, id: Uuid) -> StorageResult<bool>;

    /// File `studyset_id` into `folder_id` for `user_id`, replacing any
    /// previous folder that user had chosen for it.
    async fn set_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
        folder_id: Uuid,
    ) -> StorageResult<()>;

    async fn remove_studyset_from_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<bool>;

    /// The folder `user_id` filed `studyset_id` into, if any.
    async fn get_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<Option<Folder>>;

    /// Studysets filed into a folder, most recently updated first.
    async fn list_folder_studysets(&self, folder_id: Uuid) -> StorageResult<Vec<Studyset>>;
}

/// Repository for per-user term progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get_term_progress(
        &self,
        user_id: Uuid,
        term_id: Uuid,
    ) -> StorageResult<Option<TermProgress>>;

    /// Apply counter increments and box assignments, creating rows as needed.
    /// Results are returned in input order.
    async fn apply_term_progress(
        &self,
        user_id: Uuid,
        updates: &[TermProgressUpdate],
    ) -> StorageResult<Vec<TermProgress>>;
}

/// Repository for practice tests.
#[async_trait]
pub trait PracticeTestRepository: Send + Sync {
    async fn get_practice_test(&self, id: Uuid) -> StorageResult<Option<PracticeTest>>;

    /// A user's practice tests, `timestamp DESC, id DESC`, optionally for one
    /// studyset.
    async fn list_practice_tests(
        &self,
        user_id: Uuid,
        studyset_id: Option<Uuid>,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<PracticeTest>>;

    async fn insert_practice_test(
        &self,
        user_id: Uuid,
        test: &NewPracticeTest,
    ) -> StorageResult<PracticeTest>;

    async fn update_practice_test(
        &self,
        update: &PracticeTestUpdate,
    ) -> StorageResult<Option<PracticeTest>>;
}

/// Repository for saved (bookmarked) studysets.
#[async_trait]
pub trait SavedStudysetRepository: Send + Sync {
    /// Save a studyset; saving twice keeps the first `saved_at`.
    async fn save_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<()>;

    async fn unsave_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool>;

    async fn is_saved(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool>;

    /// A user's saved studysets, `saved_at DESC, studyset id DESC`.
    async fn list_saved_studysets(
        &self,
        user_id: Uuid,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<SavedStudyset>>;
}

/// Repository for user profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the content service.
pub trait Repositories: Send + Sync {
    fn studysets(&self) -> &dyn StudysetRepository;

    fn terms(&self) -> &dyn TermRepository;

    fn folders(&self) -> &dyn FolderRepository;

    fn progress(&self) -> &dyn ProgressRepository;

    fn practice_tests(&self) -> &dyn PracticeTestRepository;

    fn saved(&self) -> &dyn SavedStudysetRepository;

    fn users(&self) -> &dyn UserRepository;
}
