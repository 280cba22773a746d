//! GraphQL mutation root.
//!
//! A mutation on a target that is missing or that the requester may not act
//! on fails with `UNAUTHORIZED`; the two cases are indistinguishable.

use async_graphql::{Context, Object, Result, ID};

use quizhub_core::models;

use crate::error::{into_gql, parse_id};
use crate::inputs::{
    convert_batch, NewTermInput, PracticeTestInput, StudysetInput, TermInput, TermProgressInput,
};
use crate::schema::request;
use crate::types::{to_id, Folder, PracticeTest, Studyset, Term, TermProgress};

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    // -------------------------------------------------------------------------
    // Studysets
    // -------------------------------------------------------------------------

    async fn create_studyset(&self, ctx: &Context<'_>, studyset: StudysetInput) -> Result<Studyset> {
        let (service, identity) = request(ctx)?;
        service
            .create_studyset(&identity, studyset.into())
            .await
            .map(Studyset)
            .map_err(into_gql)
    }

    async fn update_studyset(
        &self,
        ctx: &Context<'_>,
        id: ID,
        studyset: StudysetInput,
    ) -> Result<Studyset> {
        let (service, identity) = request(ctx)?;
        let id = parse_id(&id).map_err(into_gql)?;
        service
            .update_studyset(&identity, id, studyset.into())
            .await
            .map(Studyset)
            .map_err(into_gql)
    }

    /// Returns the id of the deleted studyset.
    async fn delete_studyset(&self, ctx: &Context<'_>, id: ID) -> Result<ID> {
        let (service, identity) = request(ctx)?;
        let id = parse_id(&id).map_err(into_gql)?;
        service
            .delete_studyset(&identity, id)
            .await
            .map(to_id)
            .map_err(into_gql)
    }

    async fn save_studyset(&self, ctx: &Context<'_>, studyset_id: ID) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        service
            .save_studyset(&identity, studyset_id)
            .await
            .map_err(into_gql)
    }

    async fn unsave_studyset(&self, ctx: &Context<'_>, studyset_id: ID) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        service
            .unsave_studyset(&identity, studyset_id)
            .await
            .map_err(into_gql)
    }

    // -------------------------------------------------------------------------
    // Terms
    // -------------------------------------------------------------------------

    async fn create_terms(
        &self,
        ctx: &Context<'_>,
        studyset_id: ID,
        terms: Vec<NewTermInput>,
    ) -> Result<Vec<Term>> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        let terms: Vec<models::NewTerm> = terms.into_iter().map(Into::into).collect();
        let created = service
            .create_terms(&identity, studyset_id, terms)
            .await
            .map_err(into_gql)?;
        Ok(created.into_iter().map(Term).collect())
    }

    async fn update_terms(
        &self,
        ctx: &Context<'_>,
        studyset_id: ID,
        terms: Vec<TermInput>,
    ) -> Result<Vec<Term>> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        let updates: Vec<models::TermUpdate> = convert_batch(terms).map_err(into_gql)?;
        let updated = service
            .update_terms(&identity, studyset_id, updates)
            .await
            .map_err(into_gql)?;
        Ok(updated.into_iter().map(Term).collect())
    }

    /// Returns the ids of the terms actually deleted.
    async fn delete_terms(&self, ctx: &Context<'_>, studyset_id: ID, ids: Vec<ID>) -> Result<Vec<ID>> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        let ids = ids
            .iter()
            .map(parse_id)
            .collect::<Result<Vec<_>, _>>()
            .map_err(into_gql)?;
        let deleted = service
            .delete_terms(&identity, studyset_id, ids)
            .await
            .map_err(into_gql)?;
        Ok(deleted.into_iter().map(to_id).collect())
    }

    // -------------------------------------------------------------------------
    // Folders
    // -------------------------------------------------------------------------

    async fn create_folder(&self, ctx: &Context<'_>, name: String) -> Result<Folder> {
        let (service, identity) = request(ctx)?;
        service
            .create_folder(&identity, &name)
            .await
            .map(Folder)
            .map_err(into_gql)
    }

    async fn rename_folder(&self, ctx: &Context<'_>, id: ID, name: String) -> Result<Folder> {
        let (service, identity) = request(ctx)?;
        let id = parse_id(&id).map_err(into_gql)?;
        service
            .rename_folder(&identity, id, &name)
            .await
            .map(Folder)
            .map_err(into_gql)
    }

    async fn delete_folder(&self, ctx: &Context<'_>, id: ID) -> Result<ID> {
        let (service, identity) = request(ctx)?;
        let id = parse_id(&id).map_err(into_gql)?;
        service
            .delete_folder(&identity, id)
            .await
            .map(to_id)
            .map_err(into_gql)
    }

    /// File a readable studyset into one of the requester's folders,
    /// replacing any previous folder for that studyset.
    async fn set_studyset_folder(
        &self,
        ctx: &Context<'_>,
        studyset_id: ID,
        folder_id: ID,
    ) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        let folder_id = parse_id(&folder_id).map_err(into_gql)?;
        service
            .set_studyset_folder(&identity, studyset_id, folder_id)
            .await
            .map_err(into_gql)
    }

    async fn remove_studyset_from_folder(&self, ctx: &Context<'_>, studyset_id: ID) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        let studyset_id = parse_id(&studyset_id).map_err(into_gql)?;
        service
            .remove_studyset_from_folder(&identity, studyset_id)
            .await
            .map_err(into_gql)
    }

    // -------------------------------------------------------------------------
    // Learning records
    // -------------------------------------------------------------------------

    async fn update_term_progress(
        &self,
        ctx: &Context<'_>,
        term_progress: Vec<TermProgressInput>,
    ) -> Result<Vec<TermProgress>> {
        let (service, identity) = request(ctx)?;
        let updates: Vec<models::TermProgressUpdate> =
            convert_batch(term_progress).map_err(into_gql)?;
        let progress = service
            .update_term_progress(&identity, updates)
            .await
            .map_err(into_gql)?;
        Ok(progress.into_iter().map(TermProgress::from).collect())
    }

    async fn record_practice_test(
        &self,
        ctx: &Context<'_>,
        input: PracticeTestInput,
    ) -> Result<PracticeTest> {
        let (service, identity) = request(ctx)?;
        let test = input.into_new().map_err(into_gql)?;
        service
            .record_practice_test(&identity, test)
            .await
            .map(PracticeTest::from)
            .map_err(into_gql)
    }

    async fn update_practice_test(
        &self,
        ctx: &Context<'_>,
        input: PracticeTestInput,
    ) -> Result<PracticeTest> {
        let (service, identity) = request(ctx)?;
        let update = input.into_update().map_err(into_gql)?;
        service
            .update_practice_test(&identity, update)
            .await
            .map(PracticeTest::from)
            .map_err(into_gql)
    }
}
