//! Mapping of service errors onto GraphQL errors.
//!
//! Every error carries a `code` extension. Storage failures are logged here
//! and reach the client only as a generic `INTERNAL_ERROR`.

use async_graphql::{Error, ErrorExtensions, ID};
use tracing::error;
use uuid::Uuid;

use quizhub_core::error::ServiceError;

pub const CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const CODE_VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const CODE_INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Convert a [`ServiceError`] into a client-facing GraphQL error.
pub(crate) fn into_gql(err: ServiceError) -> Error {
    let (message, code) = match err {
        ServiceError::Unauthorized => (
            ServiceError::Unauthorized.to_string(),
            CODE_UNAUTHORIZED,
        ),
        ServiceError::Validation(message) => (message, CODE_VALIDATION_FAILED),
        ServiceError::Storage(err) => {
            error!(error = %err, "Storage failure while resolving request");
            ("Internal server error".to_string(), CODE_INTERNAL_ERROR)
        }
    };
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

/// Parse a client-supplied id for a mutation argument.
pub(crate) fn parse_id(id: &ID) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(id).map_err(|_| ServiceError::validation(format!("invalid id: {}", id.as_str())))
}

/// Parse a client-supplied id for a lookup; a malformed id finds nothing.
pub(crate) fn lookup_id(id: &ID) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}
