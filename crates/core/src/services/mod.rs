//! Content service - resolves every read and write against the content graph.
//!
//! [`ContentService`] is the only caller of the access policy and the
//! pagination engine. Its methods are split by entity:
//!
//! - `studysets` - studysets, the public feed, search and saved studysets
//! - `terms` - terms, with ownership through the parent studyset
//! - `folders` - folders and folder membership
//! - `progress` - per-user term progress
//! - `practice_tests` - practice test attempts
//! - `users` - public user profiles
//!
//! # Failure model
//!
//! - A single fetch of a missing or unreadable object resolves to `None`.
//! - A mutation on a missing or forbidden target fails with
//!   [`ServiceError::Unauthorized`]; both cases are indistinguishable.
//! - Input limits are checked before any storage call.

mod folders;
mod practice_tests;
mod progress;
mod studysets;
mod terms;
mod users;
mod validation;

use std::sync::Arc;

use uuid::Uuid;

use crate::access::{can_read, ensure_can_write, missing, Identity};
use crate::config::Limits;
use crate::error::{ServiceError, ServiceResult};
use crate::models::Studyset;
use crate::ports::Repositories;

/// Resolution logic for all content entities.
#[derive(Clone)]
pub struct ContentService {
    repos: Arc<dyn Repositories>,
    limits: Limits,
}

impl ContentService {
    pub fn new(repos: Arc<dyn Repositories>, limits: Limits) -> Self {
        Self { repos, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Resolve a client-supplied `first` into a page size.
    fn page_size(&self, first: Option<i32>) -> ServiceResult<usize> {
        let Some(first) = first else {
            return Ok(self.limits.default_page_size);
        };
        match usize::try_from(first) {
            Ok(n) if (1..=self.limits.max_page_size).contains(&n) => Ok(n),
            _ => Err(ServiceError::validation(format!(
                "first must be between 1 and {}, got {first}",
                self.limits.max_page_size
            ))),
        }
    }

    /// The studyset, if it exists and `identity` may read it.
    async fn readable_studyset(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> ServiceResult<Option<Studyset>> {
        let studyset = self.repos.studysets().get_studyset(id).await?;
        Ok(studyset.filter(|s| can_read(identity, s.user_id, s.private)))
    }

    /// The studyset, if it exists and `identity` owns it.
    async fn writable_studyset(
        &self,
        identity: &Identity,
        id: Uuid,
        operation: &'static str,
    ) -> ServiceResult<Studyset> {
        let studyset = self
            .repos
            .studysets()
            .get_studyset(id)
            .await?
            .ok_or_else(|| missing(identity, operation))?;
        ensure_can_write(identity, studyset.user_id, operation)?;
        Ok(studyset)
    }
}
