//! Port traits implemented by infrastructure adapters.

mod identity;
mod repository;

pub use identity::*;
pub use repository::*;
