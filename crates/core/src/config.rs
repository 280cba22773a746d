//! Request limits for content operations.
//!
//! Limits are plain values handed to [`crate::services::ContentService`] at
//! construction time, so deployments and tests can use different values.
//! Oversized requests are rejected outright, never truncated.

/// Maximum number of rows accepted by a single bulk mutation.
pub const DEFAULT_MAX_BATCH_MUTATION_SIZE: usize = 9000;
/// Maximum folder name length, in characters.
pub const DEFAULT_MAX_FOLDER_NAME_LEN: usize = 1000;
/// Maximum studyset title length, in characters.
pub const DEFAULT_MAX_TITLE_LEN: usize = 1000;
/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page a client may request.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Limits enforced before any storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum rows in `createTerms`, `updateTerms`, `deleteTerms` and
    /// `updateTermProgress`.
    pub max_batch_mutation_size: usize,
    /// Maximum folder name length, in characters.
    pub max_folder_name_len: usize,
    /// Maximum studyset title length, in characters.
    pub max_title_len: usize,
    /// Page size used when `first` is omitted.
    pub default_page_size: usize,
    /// Largest accepted `first`.
    pub max_page_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_batch_mutation_size: DEFAULT_MAX_BATCH_MUTATION_SIZE,
            max_folder_name_len: DEFAULT_MAX_FOLDER_NAME_LEN,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}
