//! Input checks run before any storage call. Values are never clamped.

use crate::config::Limits;
use crate::error::{ServiceError, ServiceResult};
use crate::models::StudysetInput;

pub(super) fn validate_studyset_input(limits: &Limits, input: &StudysetInput) -> ServiceResult<()> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title must not be empty"));
    }
    if !title.chars().any(char::is_alphanumeric) {
        return Err(ServiceError::validation(
            "title must contain at least one letter or number",
        ));
    }
    let len = input.title.chars().count();
    if len > limits.max_title_len {
        return Err(ServiceError::validation(format!(
            "title is {len} characters, the maximum is {}",
            limits.max_title_len
        )));
    }
    Ok(())
}

pub(super) fn validate_folder_name(limits: &Limits, name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation("folder name must not be empty"));
    }
    let len = name.chars().count();
    if len > limits.max_folder_name_len {
        return Err(ServiceError::validation(format!(
            "folder name is {len} characters, the maximum is {}",
            limits.max_folder_name_len
        )));
    }
    Ok(())
}

pub(super) fn validate_batch(limits: &Limits, what: &str, len: usize) -> ServiceResult<()> {
    if len > limits.max_batch_mutation_size {
        return Err(ServiceError::validation(format!(
            "{len} {what} in one request, the maximum is {}",
            limits.max_batch_mutation_size
        )));
    }
    Ok(())
}

pub(super) fn validate_score(questions_correct: i32, questions_total: i32) -> ServiceResult<()> {
    if questions_correct < 0 || questions_total < 0 {
        return Err(ServiceError::validation(
            "question counts must not be negative",
        ));
    }
    if questions_correct > questions_total {
        return Err(ServiceError::validation(format!(
            "questionsCorrect ({questions_correct}) exceeds questionsTotal ({questions_total})"
        )));
    }
    Ok(())
}
