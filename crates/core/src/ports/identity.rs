//! Port trait for resolving request credentials into an [`Identity`].
//!
//! Implementations live in the infrastructure layer (e.g., `quizhub-storage`).

use async_trait::async_trait;

use crate::access::Identity;
use crate::error::StorageResult;

/// Resolves a bearer token into the requester identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token.
    ///
    /// A missing, unknown or expired token resolves to
    /// [`Identity::Anonymous`]. A session store that cannot be read is an
    /// error, never an anonymous identity.
    async fn resolve(&self, bearer: Option<&str>) -> StorageResult<Identity>;
}
