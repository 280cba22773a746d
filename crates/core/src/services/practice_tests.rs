//! Practice test attempts. A test belongs to the user who took it.

use tracing::{info, instrument};
use uuid::Uuid;

use super::validation::validate_score;
use super::ContentService;
use crate::access::{can_read_personal, ensure_can_write, missing, require_user, Identity};
use crate::cursor::{CursorKey, RecencyKey};
use crate::error::ServiceResult;
use crate::models::{NewPracticeTest, PracticeTest, PracticeTestUpdate};
use crate::pagination::{paginate_visible, Connection};

impl ContentService {
    /// Fetch one practice test; `None` unless the requester took it.
    #[instrument(skip(self))]
    pub async fn practice_test(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> ServiceResult<Option<PracticeTest>> {
        let test = self.repos.practice_tests().get_practice_test(id).await?;
        Ok(test.filter(|t| can_read_personal(identity, t.user_id)))
    }

    /// The requester's practice tests, newest first.
    #[instrument(skip(self))]
    pub async fn my_practice_tests(
        &self,
        identity: &Identity,
        studyset_id: Option<Uuid>,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<PracticeTest>> {
        let user_id = require_user(identity, "my_practice_tests")?;
        let first = self.page_size(first)?;
        let after = RecencyKey::decode_or_start(after);
        let repo = self.repos.practice_tests();

        let connection = paginate_visible(
            first,
            after,
            |id| async move {
                Ok(repo
                    .get_practice_test(id)
                    .await?
                    .is_some_and(|t| t.user_id == user_id))
            },
            |after, limit| async move {
                repo.list_practice_tests(user_id, studyset_id, after.as_ref(), limit)
                    .await
            },
            |t: &PracticeTest| can_read_personal(identity, t.user_id),
            PracticeTest::recency_key,
        )
        .await?;

        Ok(connection)
    }

    /// Record an attempt against a studyset the requester can read.
    #[instrument(skip(self, test), fields(studyset_id = %test.studyset_id))]
    pub async fn record_practice_test(
        &self,
        identity: &Identity,
        test: NewPracticeTest,
    ) -> ServiceResult<PracticeTest> {
        validate_score(test.questions_correct, test.questions_total)?;
        let user_id = require_user(identity, "record_practice_test")?;
        self.readable_studyset(identity, test.studyset_id)
            .await?
            .ok_or_else(|| missing(identity, "record_practice_test"))?;

        let recorded = self
            .repos
            .practice_tests()
            .insert_practice_test(user_id, &test)
            .await?;
        info!(practice_test_id = %recorded.id, "Practice test recorded");
        Ok(recorded)
    }

    /// Update an attempt; only the user who took it may.
    #[instrument(skip(self, update), fields(practice_test_id = %update.id))]
    pub async fn update_practice_test(
        &self,
        identity: &Identity,
        update: PracticeTestUpdate,
    ) -> ServiceResult<PracticeTest> {
        const OPERATION: &str = "update_practice_test";

        validate_score(update.questions_correct, update.questions_total)?;
        let existing = self
            .repos
            .practice_tests()
            .get_practice_test(update.id)
            .await?
            .ok_or_else(|| missing(identity, OPERATION))?;
        ensure_can_write(identity, existing.user_id, OPERATION)?;

        self.repos
            .practice_tests()
            .update_practice_test(&update)
            .await?
            .ok_or_else(|| missing(identity, OPERATION))
    }
}
