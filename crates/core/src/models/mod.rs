//! Domain models representing the content graph.
//!
//! These models are storage-agnostic and represent the canonical
//! form of content within the domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cursor::{IdKey, RankedKey, RecencyKey};

// =============================================================================
// Users
// =============================================================================

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub is_moderator: bool,
}

// =============================================================================
// Studysets
// =============================================================================

/// A collection of terms owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Studyset {
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    pub title: String,
    /// The sole gate on third-party readability.
    pub private: bool,
    pub subject_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Studyset {
    /// Position in the `updated_at DESC, id DESC` order.
    pub fn recency_key(&self) -> RecencyKey {
        RecencyKey::new(self.updated_at, self.id)
    }
}

/// A search hit with the relevance score computed by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedStudyset {
    pub studyset: Studyset,
    /// Decimal text of the score, exactly as storage ordered by it.
    pub score: String,
}

impl RankedStudyset {
    pub fn ranked_key(&self) -> RankedKey {
        RankedKey::new(
            self.score.clone(),
            self.studyset.updated_at,
            self.studyset.id,
        )
    }
}

/// A studyset bookmarked by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedStudyset {
    pub user_id: Uuid,
    pub studyset: Studyset,
    pub saved_at: DateTime<Utc>,
}

impl SavedStudyset {
    /// Position in the `saved_at DESC, studyset id DESC` order.
    pub fn recency_key(&self) -> RecencyKey {
        RecencyKey::new(self.saved_at, self.studyset.id)
    }
}

/// Fields accepted when creating or updating a studyset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudysetInput {
    pub title: String,
    pub private: bool,
    pub subject_id: Option<String>,
}

// =============================================================================
// Terms
// =============================================================================

/// A term/definition pair. Visibility follows the parent studyset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: Uuid,
    pub studyset_id: Uuid,
    pub term: String,
    pub def: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTerm {
    pub term: String,
    pub def: String,
    pub sort_order: i32,
}

/// Partial update of one term; `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermUpdate {
    pub id: Uuid,
    pub term: Option<String>,
    pub def: Option<String>,
    pub sort_order: Option<i32>,
}

// =============================================================================
// Folders
// =============================================================================

/// A folder, always private to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

impl Folder {
    pub fn id_key(&self) -> IdKey {
        IdKey::new(self.id)
    }
}

// =============================================================================
// Learning records
// =============================================================================

/// One user's progress on one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermProgress {
    pub id: Uuid,
    pub term_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub term_correct_count: i32,
    pub term_incorrect_count: i32,
    pub def_correct_count: i32,
    pub def_incorrect_count: i32,
    pub term_leitner_system_box: Option<i32>,
    pub def_leitner_system_box: Option<i32>,
}

/// Counter increments and box assignments for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermProgressUpdate {
    pub term_id: Uuid,
    pub term_correct_increase: i32,
    pub term_incorrect_increase: i32,
    pub def_correct_increase: i32,
    pub def_incorrect_increase: i32,
    pub term_leitner_system_box: Option<i32>,
    pub def_leitner_system_box: Option<i32>,
}

/// A recorded practice test attempt, owned by the user who took it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeTest {
    pub id: Uuid,
    pub studyset_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub questions_correct: i32,
    pub questions_total: i32,
    /// Client-defined question payload, stored as-is.
    pub questions: serde_json::Value,
}

impl PracticeTest {
    pub fn recency_key(&self) -> RecencyKey {
        RecencyKey::new(self.timestamp, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPracticeTest {
    pub studyset_id: Uuid,
    pub questions_correct: i32,
    pub questions_total: i32,
    pub questions: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeTestUpdate {
    pub id: Uuid,
    pub questions_correct: i32,
    pub questions_total: i32,
    pub questions: serde_json::Value,
}
