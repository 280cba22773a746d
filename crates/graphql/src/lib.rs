//! GraphQL API for Quizhub.
//!
//! Exposes studysets, terms, folders, term progress and practice tests over
//! a single GraphQL endpoint. Every resolver delegates to
//! [`quizhub_core::services::ContentService`]; this crate only maps types,
//! errors and the HTTP transport.
//!
//! # Usage
//!
//! ```ignore
//! use quizhub_graphql::{build_schema, serve_with_shutdown, ServerConfig};
//!
//! let schema = build_schema(ContentService::new(repositories, limits));
//! serve_with_shutdown(schema, identity_provider, ServerConfig::default(), shutdown).await?;
//! ```

mod error;
mod inputs;
mod mutation;
mod schema;
mod server;
mod types;

pub use error::{CODE_INTERNAL_ERROR, CODE_UNAUTHORIZED, CODE_VALIDATION_FAILED};
pub use mutation::MutationRoot;
pub use schema::{build_schema, schema_builder, QueryRoot, MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH};
pub use server::{router, serve_with_shutdown, ServerConfig};
pub use types::QuizhubSchema;
