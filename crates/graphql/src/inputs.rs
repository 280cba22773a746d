//! GraphQL input objects and their conversion into domain inputs.

use async_graphql::{InputObject, ID};

use quizhub_core::error::ServiceError;
use quizhub_core::models;

use crate::error::parse_id;

#[derive(InputObject)]
pub struct StudysetInput {
    pub title: String,
    #[graphql(default)]
    pub private: bool,
    pub subject_id: Option<String>,
}

impl From<StudysetInput> for models::StudysetInput {
    fn from(input: StudysetInput) -> Self {
        Self {
            title: input.title,
            private: input.private,
            subject_id: input.subject_id,
        }
    }
}

#[derive(InputObject)]
pub struct NewTermInput {
    pub term: String,
    pub def: String,
    pub sort_order: i32,
}

impl From<NewTermInput> for models::NewTerm {
    fn from(input: NewTermInput) -> Self {
        Self {
            term: input.term,
            def: input.def,
            sort_order: input.sort_order,
        }
    }
}

/// Edit of an existing term; omitted fields are left unchanged.
#[derive(InputObject)]
pub struct TermInput {
    pub id: ID,
    pub term: Option<String>,
    pub def: Option<String>,
    pub sort_order: Option<i32>,
}

impl TryFrom<TermInput> for models::TermUpdate {
    type Error = ServiceError;

    fn try_from(input: TermInput) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&input.id)?,
            term: input.term,
            def: input.def,
            sort_order: input.sort_order,
        })
    }
}

/// Progress deltas for one term. Absent Leitner boxes keep their value.
#[derive(InputObject)]
pub struct TermProgressInput {
    pub term_id: ID,
    #[graphql(default)]
    pub term_correct_increase: i32,
    #[graphql(default)]
    pub term_incorrect_increase: i32,
    #[graphql(default)]
    pub def_correct_increase: i32,
    #[graphql(default)]
    pub def_incorrect_increase: i32,
    pub term_leitner_system_box: Option<i32>,
    pub def_leitner_system_box: Option<i32>,
}

impl TryFrom<TermProgressInput> for models::TermProgressUpdate {
    type Error = ServiceError;

    fn try_from(input: TermProgressInput) -> Result<Self, Self::Error> {
        Ok(Self {
            term_id: parse_id(&input.term_id)?,
            term_correct_increase: input.term_correct_increase,
            term_incorrect_increase: input.term_incorrect_increase,
            def_correct_increase: input.def_correct_increase,
            def_incorrect_increase: input.def_incorrect_increase,
            term_leitner_system_box: input.term_leitner_system_box,
            def_leitner_system_box: input.def_leitner_system_box,
        })
    }
}

/// A practice test result.
///
/// `recordPracticeTest` requires `studysetId`; `updatePracticeTest` requires `id`.
#[derive(InputObject)]
pub struct PracticeTestInput {
    pub id: Option<ID>,
    pub studyset_id: Option<ID>,
    pub questions_correct: i32,
    pub questions_total: i32,
    pub questions: serde_json::Value,
}

impl PracticeTestInput {
    pub(crate) fn into_new(self) -> Result<models::NewPracticeTest, ServiceError> {
        let studyset_id = self
            .studyset_id
            .as_ref()
            .ok_or_else(|| ServiceError::validation("studysetId is required"))?;
        Ok(models::NewPracticeTest {
            studyset_id: parse_id(studyset_id)?,
            questions_correct: self.questions_correct,
            questions_total: self.questions_total,
            questions: self.questions,
        })
    }

    pub(crate) fn into_update(self) -> Result<models::PracticeTestUpdate, ServiceError> {
        let id = self
            .id
            .as_ref()
            .ok_or_else(|| ServiceError::validation("id is required"))?;
        Ok(models::PracticeTestUpdate {
            id: parse_id(id)?,
            questions_correct: self.questions_correct,
            questions_total: self.questions_total,
            questions: self.questions,
        })
    }
}

/// Convert a batch, failing on the first malformed entry.
pub(crate) fn convert_batch<I, T>(inputs: Vec<I>) -> Result<Vec<T>, ServiceError>
where
    T: TryFrom<I, Error = ServiceError>,
{
    inputs.into_iter().map(T::try_from).collect()
}
