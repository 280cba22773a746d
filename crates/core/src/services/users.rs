//! Public user profiles.

use tracing::instrument;
use uuid::Uuid;

use super::ContentService;
use crate::error::ServiceResult;
use crate::models::User;

impl ContentService {
    /// Public profile of a user. Profiles are readable by everyone.
    #[instrument(skip(self))]
    pub async fn user(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.repos.users().get_user(id).await?)
    }
}
