//! GraphQL schema definition.
//!
//! The query root exposes single-object lookups, which resolve to `null` for
//! anything missing or not readable, and the paginated lists. The requester's
//! [`Identity`] is attached to each request by the HTTP layer.

use async_graphql::{Context, EmptySubscription, Object, Result, Schema, SchemaBuilder, ID};

use quizhub_core::access::{require_user, Identity};
use quizhub_core::services::ContentService;

use crate::error::{into_gql, lookup_id, parse_id};
use crate::mutation::MutationRoot;
use crate::types::{
    Folder, FolderConnection, PracticeTest, PracticeTestConnection, QuizhubSchema,
    SavedStudysetConnection, Studyset, StudysetConnection, StudysetSearchConnection, Term, User,
};

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the schema with depth and complexity limits applied.
pub fn build_schema(service: ContentService) -> QuizhubSchema {
    schema_builder(service)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

/// Create a schema builder with the content service attached.
///
/// Remember to call `.limit_depth()` and `.limit_complexity()` before `.finish()`.
pub fn schema_builder(
    service: ContentService,
) -> SchemaBuilder<QueryRoot, MutationRoot, EmptySubscription> {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).data(service)
}

/// The service and the requester for the current request.
///
/// A request without an attached identity is anonymous.
pub(crate) fn request<'a>(ctx: &Context<'a>) -> Result<(&'a ContentService, Identity)> {
    let service = ctx.data::<ContentService>()?;
    let identity = ctx.data_opt::<Identity>().copied().unwrap_or_default();
    Ok((service, identity))
}

// -----------------------------------------------------------------------------
// Query Root
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Succeeds only for an authenticated requester.
    async fn authed(&self, ctx: &Context<'_>) -> Result<bool> {
        let (_, identity) = request(ctx)?;
        require_user(&identity, "authed").map_err(into_gql)?;
        Ok(true)
    }

    /// Public profile of a user.
    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<User>> {
        let (service, _) = request(ctx)?;
        let Some(id) = lookup_id(&id) else {
            return Ok(None);
        };
        let user = service.user(id).await.map_err(into_gql)?;
        Ok(user.map(User))
    }

    /// Get a studyset by id.
    async fn studyset(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Studyset>> {
        let (service, identity) = request(ctx)?;
        let Some(id) = lookup_id(&id) else {
            return Ok(None);
        };
        let studyset = service.studyset(&identity, id).await.map_err(into_gql)?;
        Ok(studyset.map(Studyset))
    }

    /// Get a term by id.
    async fn term(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Term>> {
        let (service, identity) = request(ctx)?;
        let Some(id) = lookup_id(&id) else {
            return Ok(None);
        };
        let term = service.term(&identity, id).await.map_err(into_gql)?;
        Ok(term.map(Term))
    }

    /// Get a folder by id.
    async fn folder(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Folder>> {
        let (service, identity) = request(ctx)?;
        let Some(id) = lookup_id(&id) else {
            return Ok(None);
        };
        let folder = service.folder(&identity, id).await.map_err(into_gql)?;
        Ok(folder.map(Folder))
    }

    /// Get one of the requester's practice tests by id.
    async fn practice_test(&self, ctx: &Context<'_>, id: ID) -> Result<Option<PracticeTest>> {
        let (service, identity) = request(ctx)?;
        let Some(id) = lookup_id(&id) else {
            return Ok(None);
        };
        let test = service
            .practice_test(&identity, id)
            .await
            .map_err(into_gql)?;
        Ok(test.map(PracticeTest::from))
    }

    /// Public studysets, most recently updated first.
    async fn recent_studysets(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<StudysetConnection> {
        let (service, identity) = request(ctx)?;
        service
            .recent_studysets(&identity, first, after.as_deref())
            .await
            .map(StudysetConnection::from)
            .map_err(into_gql)
    }

    /// Keyword search over public studysets, best match first.
    async fn search_studysets(
        &self,
        ctx: &Context<'_>,
        query: String,
        subject_id: Option<String>,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<StudysetSearchConnection> {
        let (service, identity) = request(ctx)?;
        service
            .search_studysets(
                &identity,
                &query,
                subject_id.as_deref(),
                first,
                after.as_deref(),
            )
            .await
            .map(StudysetSearchConnection::from)
            .map_err(into_gql)
    }

    /// The requester's folders.
    async fn my_folders(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<FolderConnection> {
        let (service, identity) = request(ctx)?;
        service
            .my_folders(&identity, first, after.as_deref())
            .await
            .map(FolderConnection::from)
            .map_err(into_gql)
    }

    /// The requester's saved studysets, most recently saved first.
    async fn my_saved_studysets(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<SavedStudysetConnection> {
        let (service, identity) = request(ctx)?;
        service
            .my_saved_studysets(&identity, first, after.as_deref())
            .await
            .map(SavedStudysetConnection::from)
            .map_err(into_gql)
    }

    /// The requester's practice tests, newest first, optionally for one studyset.
    async fn my_practice_tests(
        &self,
        ctx: &Context<'_>,
        studyset_id: Option<ID>,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<PracticeTestConnection> {
        let (service, identity) = request(ctx)?;
        let studyset_id = studyset_id
            .as_ref()
            .map(parse_id)
            .transpose()
            .map_err(into_gql)?;
        service
            .my_practice_tests(&identity, studyset_id, first, after.as_deref())
            .await
            .map(PracticeTestConnection::from)
            .map_err(into_gql)
    }
}
