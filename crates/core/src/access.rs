//! Requester identity, visibility policy and ownership guard.
//!
//! Every read and write against the content graph goes through the three
//! decision functions below. They are pure and hold no state, so resolvers
//! call them per object on every request.
//!
//! | Function              | Anonymous | Owner | Other user | Moderator (not owner) |
//! |-----------------------|-----------|-------|------------|-----------------------|
//! | [`can_read`] public   | yes       | yes   | yes        | yes                   |
//! | [`can_read`] private  | no        | yes   | no         | yes                   |
//! | [`can_read_personal`] | no        | yes   | no         | no                    |
//! | [`can_write`]         | no        | yes   | no         | no                    |

use tracing::debug;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::metrics::record_access_denied;

/// Who is making the request. Resolved once per request, never mutated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated { user_id: Uuid, is_moderator: bool },
}

impl Identity {
    pub fn user(user_id: Uuid) -> Self {
        Self::Authenticated {
            user_id,
            is_moderator: false,
        }
    }

    pub fn moderator(user_id: Uuid) -> Self {
        Self::Authenticated {
            user_id,
            is_moderator: true,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    pub fn is_moderator(&self) -> bool {
        matches!(
            self,
            Self::Authenticated {
                is_moderator: true,
                ..
            }
        )
    }

    fn is(&self, user: Uuid) -> bool {
        self.user_id() == Some(user)
    }
}

/// Whether `identity` may read an object owned by `owner`.
pub fn can_read(identity: &Identity, owner: Uuid, private: bool) -> bool {
    !private || identity.is(owner) || identity.is_moderator()
}

/// Whether `identity` may read a personal learning record (term progress,
/// practice test) belonging to `record_user`. Moderators get no override.
pub fn can_read_personal(identity: &Identity, record_user: Uuid) -> bool {
    identity.is(record_user)
}

/// Whether `identity` may mutate an object owned by `owner`.
pub fn can_write(identity: &Identity, owner: Uuid) -> bool {
    identity.is(owner)
}

// =============================================================================
// Guards
// =============================================================================

fn deny(operation: &'static str, identity: &Identity) -> ServiceError {
    debug!(operation, user_id = ?identity.user_id(), "Access denied");
    record_access_denied(operation);
    ServiceError::Unauthorized
}

/// The authenticated user id, or `Unauthorized`.
pub fn require_user(identity: &Identity, operation: &'static str) -> ServiceResult<Uuid> {
    identity.user_id().ok_or_else(|| deny(operation, identity))
}

pub fn ensure_can_read(
    identity: &Identity,
    owner: Uuid,
    private: bool,
    operation: &'static str,
) -> ServiceResult<()> {
    if can_read(identity, owner, private) {
        Ok(())
    } else {
        Err(deny(operation, identity))
    }
}

pub fn ensure_can_write(
    identity: &Identity,
    owner: Uuid,
    operation: &'static str,
) -> ServiceResult<()> {
    if can_write(identity, owner) {
        Ok(())
    } else {
        Err(deny(operation, identity))
    }
}

pub fn ensure_can_read_personal(
    identity: &Identity,
    record_user: Uuid,
    operation: &'static str,
) -> ServiceResult<()> {
    if can_read_personal(identity, record_user) {
        Ok(())
    } else {
        Err(deny(operation, identity))
    }
}

/// Uniform denial for a target that does not exist.
pub fn missing(identity: &Identity, operation: &'static str) -> ServiceError {
    deny(operation, identity)
}
