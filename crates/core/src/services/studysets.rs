//! Studysets, the public feed, search and saved studysets.

use tracing::{info, instrument};
use uuid::Uuid;

use super::validation::validate_studyset_input;
use super::ContentService;
use crate::access::{can_read, can_write, missing, require_user, Identity};
use crate::cursor::{CursorKey, RankedKey, RecencyKey};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{RankedStudyset, SavedStudyset, Studyset, StudysetInput};
use crate::pagination::{paginate_visible, Connection};

impl ContentService {
    /// Fetch one studyset; `None` when missing or not readable.
    #[instrument(skip(self))]
    pub async fn studyset(&self, identity: &Identity, id: Uuid) -> ServiceResult<Option<Studyset>> {
        self.readable_studyset(identity, id).await
    }

    /// A user's studysets, most recently updated first.
    ///
    /// `include_private` widens the candidate set; each row is still checked
    /// against the visibility policy.
    #[instrument(skip(self))]
    pub async fn user_studysets(
        &self,
        identity: &Identity,
        user_id: Uuid,
        include_private: bool,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<Studyset>> {
        let first = self.page_size(first)?;
        let after = RecencyKey::decode_or_start(after);
        let repo = self.repos.studysets();

        let connection = paginate_visible(
            first,
            after,
            |id| async move {
                Ok(repo
                    .get_studyset(id)
                    .await?
                    .is_some_and(|s| s.user_id == user_id))
            },
            |after, limit| async move {
                repo.list_studysets_by_user(user_id, include_private, after.as_ref(), limit)
                    .await
            },
            |s: &Studyset| can_read(identity, s.user_id, s.private),
            Studyset::recency_key,
        )
        .await?;

        Ok(connection)
    }

    /// Public studysets of every user, most recently updated first.
    #[instrument(skip(self))]
    pub async fn recent_studysets(
        &self,
        identity: &Identity,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<Studyset>> {
        let first = self.page_size(first)?;
        let after = RecencyKey::decode_or_start(after);
        let repo = self.repos.studysets();

        let connection = paginate_visible(
            first,
            after,
            |id| async move { Ok(repo.get_studyset(id).await?.is_some()) },
            |after, limit| async move { repo.list_recent_studysets(after.as_ref(), limit).await },
            |s: &Studyset| can_read(identity, s.user_id, s.private),
            Studyset::recency_key,
        )
        .await?;

        Ok(connection)
    }

    /// Ranked keyword search, best match first.
    #[instrument(skip(self))]
    pub async fn search_studysets(
        &self,
        identity: &Identity,
        query: &str,
        subject_id: Option<&str>,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<RankedStudyset>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::validation("search query must not be empty"));
        }
        let first = self.page_size(first)?;
        let after = RankedKey::decode_or_start(after);
        let repo = self.repos.studysets();

        let connection = paginate_visible(
            first,
            after,
            |id| async move { Ok(repo.get_studyset(id).await?.is_some()) },
            |after, limit| async move {
                repo.search_studysets(query, subject_id, after.as_ref(), limit)
                    .await
            },
            |hit: &RankedStudyset| can_read(identity, hit.studyset.user_id, hit.studyset.private),
            RankedStudyset::ranked_key,
        )
        .await?;

        Ok(connection)
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_studyset(
        &self,
        identity: &Identity,
        input: StudysetInput,
    ) -> ServiceResult<Studyset> {
        validate_studyset_input(&self.limits, &input)?;
        let owner = require_user(identity, "create_studyset")?;

        let studyset = self
            .repos
            .studysets()
            .insert_studyset(owner, &input)
            .await?;
        info!(studyset_id = %studyset.id, "Studyset created");
        Ok(studyset)
    }

    #[instrument(skip(self, input))]
    pub async fn update_studyset(
        &self,
        identity: &Identity,
        id: Uuid,
        input: StudysetInput,
    ) -> ServiceResult<Studyset> {
        validate_studyset_input(&self.limits, &input)?;
        self.writable_studyset(identity, id, "update_studyset")
            .await?;

        self.repos
            .studysets()
            .update_studyset(id, &input)
            .await?
            .ok_or_else(|| missing(identity, "update_studyset"))
    }

    /// Delete a studyset; terms, memberships and learning records go with it.
    #[instrument(skip(self))]
    pub async fn delete_studyset(&self, identity: &Identity, id: Uuid) -> ServiceResult<Uuid> {
        self.writable_studyset(identity, id, "delete_studyset")
            .await?;

        if !self.repos.studysets().delete_studyset(id).await? {
            return Err(missing(identity, "delete_studyset"));
        }
        info!(studyset_id = %id, "Studyset deleted");
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Saved studysets
    // -------------------------------------------------------------------------

    /// Bookmark a readable studyset.
    #[instrument(skip(self))]
    pub async fn save_studyset(&self, identity: &Identity, studyset_id: Uuid) -> ServiceResult<bool> {
        let user_id = require_user(identity, "save_studyset")?;
        self.readable_studyset(identity, studyset_id)
            .await?
            .ok_or_else(|| missing(identity, "save_studyset"))?;

        self.repos
            .saved()
            .save_studyset(user_id, studyset_id)
            .await?;
        Ok(true)
    }

    /// Remove a bookmark. Removing one that does not exist is not an error.
    #[instrument(skip(self))]
    pub async fn unsave_studyset(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
    ) -> ServiceResult<bool> {
        let user_id = require_user(identity, "unsave_studyset")?;
        self.repos
            .saved()
            .unsave_studyset(user_id, studyset_id)
            .await?;
        Ok(true)
    }

    /// Whether the requester saved the studyset; always `false` when anonymous.
    pub async fn is_saved(&self, identity: &Identity, studyset: &Studyset) -> ServiceResult<bool> {
        let Some(user_id) = identity.user_id() else {
            return Ok(false);
        };
        Ok(self.repos.saved().is_saved(user_id, studyset.id).await?)
    }

    /// The requester's saved studysets, most recently saved first.
    ///
    /// A saved studyset that is no longer readable is left out.
    #[instrument(skip(self))]
    pub async fn my_saved_studysets(
        &self,
        identity: &Identity,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<SavedStudyset>> {
        let user_id = require_user(identity, "my_saved_studysets")?;
        let first = self.page_size(first)?;
        let after = RecencyKey::decode_or_start(after);
        let repo = self.repos.saved();

        let connection = paginate_visible(
            first,
            after,
            |id| async move { repo.is_saved(user_id, id).await },
            |after, limit| async move {
                repo.list_saved_studysets(user_id, after.as_ref(), limit)
                    .await
            },
            |saved: &SavedStudyset| {
                can_read(identity, saved.studyset.user_id, saved.studyset.private)
            },
            SavedStudyset::recency_key,
        )
        .await?;

        Ok(connection)
    }

    /// Number of terms in a studyset the requester can read.
    pub async fn terms_count(&self, identity: &Identity, studyset: &Studyset) -> ServiceResult<i64> {
        if !can_read(identity, studyset.user_id, studyset.private) {
            return Ok(0);
        }
        Ok(self.repos.terms().count_terms(studyset.id).await?)
    }

    /// Whether the requester owns the studyset.
    pub fn can_edit(&self, identity: &Identity, studyset: &Studyset) -> bool {
        can_write(identity, studyset.user_id)
    }
}
