//! Terms. Visibility and ownership come from the parent studyset.

use tracing::{info, instrument};
use uuid::Uuid;

use super::validation::validate_batch;
use super::ContentService;
use crate::access::{can_read, Identity};
use crate::error::ServiceResult;
use crate::models::{NewTerm, Studyset, Term, TermUpdate};

impl ContentService {
    /// Fetch one term; `None` when missing or its studyset is not readable.
    #[instrument(skip(self))]
    pub async fn term(&self, identity: &Identity, id: Uuid) -> ServiceResult<Option<Term>> {
        let Some(term) = self.repos.terms().get_term(id).await? else {
            return Ok(None);
        };
        let parent = self.readable_studyset(identity, term.studyset_id).await?;
        Ok(parent.map(|_| term))
    }

    /// Terms of a studyset in sort order; empty when the studyset is not
    /// readable.
    pub async fn studyset_terms(
        &self,
        identity: &Identity,
        studyset: &Studyset,
    ) -> ServiceResult<Vec<Term>> {
        if !can_read(identity, studyset.user_id, studyset.private) {
            return Ok(Vec::new());
        }
        Ok(self.repos.terms().list_terms(studyset.id).await?)
    }

    #[instrument(skip(self, terms), fields(count = terms.len()))]
    pub async fn create_terms(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
        terms: Vec<NewTerm>,
    ) -> ServiceResult<Vec<Term>> {
        validate_batch(&self.limits, "terms", terms.len())?;
        self.writable_studyset(identity, studyset_id, "create_terms")
            .await?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let created = self
            .repos
            .terms()
            .insert_terms(studyset_id, &terms)
            .await?;
        info!(studyset_id = %studyset_id, count = created.len(), "Terms created");
        Ok(created)
    }

    /// Update terms of a studyset; ids from other studysets are ignored.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_terms(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
        updates: Vec<TermUpdate>,
    ) -> ServiceResult<Vec<Term>> {
        validate_batch(&self.limits, "terms", updates.len())?;
        self.writable_studyset(identity, studyset_id, "update_terms")
            .await?;
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .repos
            .terms()
            .update_terms(studyset_id, &updates)
            .await?)
    }

    /// Delete terms of a studyset, returning the ids actually deleted.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_terms(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
        ids: Vec<Uuid>,
    ) -> ServiceResult<Vec<Uuid>> {
        validate_batch(&self.limits, "terms", ids.len())?;
        self.writable_studyset(identity, studyset_id, "delete_terms")
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let deleted = self
            .repos
            .terms()
            .delete_terms(studyset_id, &ids)
            .await?;
        info!(studyset_id = %studyset_id, count = deleted.len(), "Terms deleted");
        Ok(deleted)
    }
}
