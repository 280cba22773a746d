//! Core domain layer for the Quizhub API.
//!
//! This crate contains the domain models, the pagination cursor engine,
//! the access policy, the port traits (interfaces) implemented by adapters
//! and the [`services::ContentService`] that resolves every read and write
//! against the content graph. It has no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     quizhub (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │        quizhub-graphql        │       quizhub-storage       │
//! │      (schema + HTTP API)      │  (PostgreSQL / in-memory)   │
//! ├───────────────────────────────┴─────────────────────────────┤
//! │                     quizhub-core  ← YOU ARE HERE            │
//! │     (models, cursors, access policy, ports, services)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Studyset, Term, Folder, ...)
//! - [`cursor`] - Opaque keyset cursor encoding
//! - [`pagination`] - Relay-style connections and the visibility-aware pager
//! - [`access`] - Requester identity, visibility policy and ownership guard
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Resolution logic for every entity
//! - [`config`] - Request limits threaded into the service
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Resolution Sequence
//!
//! Every paginated, visibility-gated list follows the same order:
//!
//! 1. Resolve the requester [`access::Identity`] (or `Anonymous`)
//! 2. Decode the `after` cursor; an invalid cursor means "start of sequence"
//! 3. Fetch `first + 1` candidate rows past the cursor position
//! 4. Drop rows the requester may not read, re-fetching while the page is short
//! 5. Trim to the page size and build the connection

pub mod access;
pub mod config;
pub mod cursor;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod ports;
pub mod services;
