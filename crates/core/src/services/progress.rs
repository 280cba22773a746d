//! Per-user term progress.
//!
//! Progress rows belong to the user who studied, not to the studyset owner.
//! Only that user reads them. Writing requires the term's studyset to be
//! readable by the requester.

use std::collections::HashSet;

use tracing::{debug, instrument};
use uuid::Uuid;

use super::validation::validate_batch;
use super::ContentService;
use crate::access::{can_read_personal, ensure_can_read, missing, require_user, Identity};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Term, TermProgress, TermProgressUpdate};

impl ContentService {
    /// The requester's own progress on a term; `None` when anonymous or when
    /// nothing was recorded yet.
    pub async fn term_progress(
        &self,
        identity: &Identity,
        term: &Term,
    ) -> ServiceResult<Option<TermProgress>> {
        let Some(user_id) = identity.user_id() else {
            return Ok(None);
        };
        let progress = self
            .repos
            .progress()
            .get_term_progress(user_id, term.id)
            .await?;
        Ok(progress.filter(|p| can_read_personal(identity, p.user_id)))
    }

    /// Apply a batch of progress updates for the requester.
    ///
    /// Every term is checked before anything is written.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_term_progress(
        &self,
        identity: &Identity,
        updates: Vec<TermProgressUpdate>,
    ) -> ServiceResult<Vec<TermProgress>> {
        validate_batch(&self.limits, "progress updates", updates.len())?;
        for update in &updates {
            validate_progress_update(update)?;
        }
        let user_id = require_user(identity, "update_term_progress")?;

        let term_ids: HashSet<Uuid> = updates.iter().map(|u| u.term_id).collect();
        for term_id in term_ids {
            self.ensure_term_readable(identity, term_id).await?;
        }
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let progress = self
            .repos
            .progress()
            .apply_term_progress(user_id, &updates)
            .await?;
        debug!(user_id = %user_id, count = progress.len(), "Term progress updated");
        Ok(progress)
    }

    async fn ensure_term_readable(&self, identity: &Identity, term_id: Uuid) -> ServiceResult<()> {
        const OPERATION: &str = "update_term_progress";

        let term = self
            .repos
            .terms()
            .get_term(term_id)
            .await?
            .ok_or_else(|| missing(identity, OPERATION))?;
        let studyset = self
            .repos
            .studysets()
            .get_studyset(term.studyset_id)
            .await?
            .ok_or_else(|| missing(identity, OPERATION))?;
        ensure_can_read(identity, studyset.user_id, studyset.private, OPERATION)
    }
}

fn validate_progress_update(update: &TermProgressUpdate) -> ServiceResult<()> {
    let increases = [
        update.term_correct_increase,
        update.term_incorrect_increase,
        update.def_correct_increase,
        update.def_incorrect_increase,
    ];
    if increases.iter().any(|n| *n < 0) {
        return Err(ServiceError::validation(
            "progress increases must not be negative",
        ));
    }
    let boxes = [update.term_leitner_system_box, update.def_leitner_system_box];
    if boxes.iter().flatten().any(|b| *b < 0) {
        return Err(ServiceError::validation(
            "Leitner system box must not be negative",
        ));
    }
    Ok(())
}
