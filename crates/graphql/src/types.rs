//! GraphQL type definitions.
//!
//! Object types wrap the domain models and resolve their relations through
//! [`ContentService`], so every nested field is authorized the same way as a
//! top-level query.

use async_graphql::{
    ComplexObject, Context, EmptySubscription, Object, Result, Schema, SimpleObject, ID,
};
use chrono::{DateTime, Utc};

use quizhub_core::models;
use quizhub_core::pagination;

use crate::error::into_gql;
use crate::mutation::MutationRoot;
use crate::schema::{request, QueryRoot};

/// The Quizhub GraphQL schema type.
pub type QuizhubSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub(crate) fn to_id(id: uuid::Uuid) -> ID {
    ID::from(id.to_string())
}

// -----------------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------------

/// Public profile of a user.
pub struct User(pub models::User);

#[Object]
impl User {
    async fn id(&self) -> ID {
        to_id(self.0.id)
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn display_name(&self) -> Option<&str> {
        self.0.display_name.as_deref()
    }

    /// The user's studysets the requester can read, most recently updated first.
    async fn studysets(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] include_private: bool,
        first: Option<i32>,
        after: Option<String>,
    ) -> Result<StudysetConnection> {
        let (service, identity) = request(ctx)?;
        service
            .user_studysets(&identity, self.0.id, include_private, first, after.as_deref())
            .await
            .map(StudysetConnection::from)
            .map_err(into_gql)
    }
}

// -----------------------------------------------------------------------------
// Studysets
// -----------------------------------------------------------------------------

/// A collection of terms.
pub struct Studyset(pub models::Studyset);

#[Object]
impl Studyset {
    async fn id(&self) -> ID {
        to_id(self.0.id)
    }

    async fn user_id(&self) -> ID {
        to_id(self.0.user_id)
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn private(&self) -> bool {
        self.0.private
    }

    async fn subject_id(&self) -> Option<&str> {
        self.0.subject_id.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    /// Owner profile.
    async fn user(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let (service, _) = request(ctx)?;
        let user = service.user(self.0.user_id).await.map_err(into_gql)?;
        Ok(user.map(User))
    }

    /// Terms in display order.
    async fn terms(&self, ctx: &Context<'_>) -> Result<Vec<Term>> {
        let (service, identity) = request(ctx)?;
        let terms = service
            .studyset_terms(&identity, &self.0)
            .await
            .map_err(into_gql)?;
        Ok(terms.into_iter().map(Term).collect())
    }

    async fn terms_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let (service, identity) = request(ctx)?;
        service
            .terms_count(&identity, &self.0)
            .await
            .map_err(into_gql)
    }

    /// The requester's folder holding this studyset, if any.
    async fn folder(&self, ctx: &Context<'_>) -> Result<Option<Folder>> {
        let (service, identity) = request(ctx)?;
        let folder = service
            .studyset_folder(&identity, &self.0)
            .await
            .map_err(into_gql)?;
        Ok(folder.map(Folder))
    }

    /// Whether the requester saved this studyset.
    async fn saved(&self, ctx: &Context<'_>) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        service.is_saved(&identity, &self.0).await.map_err(into_gql)
    }

    /// Whether the requester may modify this studyset.
    async fn can_edit(&self, ctx: &Context<'_>) -> Result<bool> {
        let (service, identity) = request(ctx)?;
        Ok(service.can_edit(&identity, &self.0))
    }
}

// -----------------------------------------------------------------------------
// Terms
// -----------------------------------------------------------------------------

pub struct Term(pub models::Term);

#[Object]
impl Term {
    async fn id(&self) -> ID {
        to_id(self.0.id)
    }

    async fn studyset_id(&self) -> ID {
        to_id(self.0.studyset_id)
    }

    async fn term(&self) -> &str {
        &self.0.term
    }

    async fn def(&self) -> &str {
        &self.0.def
    }

    async fn sort_order(&self) -> i32 {
        self.0.sort_order
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    /// The requester's own progress on this term.
    async fn progress(&self, ctx: &Context<'_>) -> Result<Option<TermProgress>> {
        let (service, identity) = request(ctx)?;
        let progress = service
            .term_progress(&identity, &self.0)
            .await
            .map_err(into_gql)?;
        Ok(progress.map(TermProgress::from))
    }

    async fn studyset(&self, ctx: &Context<'_>) -> Result<Option<Studyset>> {
        let (service, identity) = request(ctx)?;
        let studyset = service
            .studyset(&identity, self.0.studyset_id)
            .await
            .map_err(into_gql)?;
        Ok(studyset.map(Studyset))
    }
}

// -----------------------------------------------------------------------------
// Folders
// -----------------------------------------------------------------------------

pub struct Folder(pub models::Folder);

#[Object]
impl Folder {
    async fn id(&self) -> ID {
        to_id(self.0.id)
    }

    async fn user_id(&self) -> ID {
        to_id(self.0.user_id)
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    /// Member studysets the requester can still read.
    async fn studysets(&self, ctx: &Context<'_>) -> Result<Vec<Studyset>> {
        let (service, identity) = request(ctx)?;
        let studysets = service
            .folder_studysets(&identity, &self.0)
            .await
            .map_err(into_gql)?;
        Ok(studysets.into_iter().map(Studyset).collect())
    }
}

// -----------------------------------------------------------------------------
// Learning records
// -----------------------------------------------------------------------------

/// Per-user learning counters for one term.
#[derive(SimpleObject)]
pub struct TermProgress {
    pub id: ID,
    pub term_id: ID,
    pub user_id: ID,
    pub timestamp: DateTime<Utc>,
    pub term_correct_count: i32,
    pub term_incorrect_count: i32,
    pub def_correct_count: i32,
    pub def_incorrect_count: i32,
    pub term_leitner_system_box: Option<i32>,
    pub def_leitner_system_box: Option<i32>,
}

impl From<models::TermProgress> for TermProgress {
    fn from(p: models::TermProgress) -> Self {
        Self {
            id: to_id(p.id),
            term_id: to_id(p.term_id),
            user_id: to_id(p.user_id),
            timestamp: p.timestamp,
            term_correct_count: p.term_correct_count,
            term_incorrect_count: p.term_incorrect_count,
            def_correct_count: p.def_correct_count,
            def_incorrect_count: p.def_incorrect_count,
            term_leitner_system_box: p.term_leitner_system_box,
            def_leitner_system_box: p.def_leitner_system_box,
        }
    }
}

/// One practice test attempt.
#[derive(SimpleObject)]
#[graphql(complex)]
pub struct PracticeTest {
    pub id: ID,
    pub studyset_id: ID,
    pub user_id: ID,
    pub timestamp: DateTime<Utc>,
    pub questions_correct: i32,
    pub questions_total: i32,
    pub questions: serde_json::Value,
    #[graphql(skip)]
    studyset_uuid: uuid::Uuid,
}

#[ComplexObject]
impl PracticeTest {
    async fn studyset(&self, ctx: &Context<'_>) -> Result<Option<Studyset>> {
        let (service, identity) = request(ctx)?;
        let studyset = service
            .studyset(&identity, self.studyset_uuid)
            .await
            .map_err(into_gql)?;
        Ok(studyset.map(Studyset))
    }
}

impl From<models::PracticeTest> for PracticeTest {
    fn from(t: models::PracticeTest) -> Self {
        Self {
            id: to_id(t.id),
            studyset_id: to_id(t.studyset_id),
            user_id: to_id(t.user_id),
            timestamp: t.timestamp,
            questions_correct: t.questions_correct,
            questions_total: t.questions_total,
            questions: t.questions,
            studyset_uuid: t.studyset_id,
        }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

#[derive(SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

impl From<pagination::PageInfo> for PageInfo {
    fn from(info: pagination::PageInfo) -> Self {
        Self {
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            start_cursor: info.start_cursor.map(|c| c.value),
            end_cursor: info.end_cursor.map(|c| c.value),
        }
    }
}

/// Generate Relay-style connection types (Edge + Connection) with From impl.
macro_rules! define_connection {
    ($node:ident, $core_model:ty, $edge:ident, $connection:ident) => {
        define_connection!($node, $core_model, $edge, $connection, $node::from);
    };
    ($node:ident, $core_model:ty, $edge:ident, $connection:ident, $convert:expr) => {
        #[derive(SimpleObject)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(SimpleObject)]
        pub struct $connection {
            pub edges: Vec<$edge>,
            pub page_info: PageInfo,
        }

        impl From<pagination::Connection<$core_model>> for $connection {
            fn from(conn: pagination::Connection<$core_model>) -> Self {
                let convert: fn($core_model) -> $node = $convert;
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: convert(e.node),
                            cursor: e.cursor.value,
                        })
                        .collect(),
                    page_info: PageInfo::from(conn.page_info),
                }
            }
        }
    };
}

define_connection!(Studyset, models::Studyset, StudysetEdge, StudysetConnection, Studyset);
define_connection!(
    Studyset,
    models::RankedStudyset,
    StudysetSearchEdge,
    StudysetSearchConnection,
    |hit| Studyset(hit.studyset)
);
define_connection!(
    Studyset,
    models::SavedStudyset,
    SavedStudysetEdge,
    SavedStudysetConnection,
    |saved| Studyset(saved.studyset)
);
define_connection!(Folder, models::Folder, FolderEdge, FolderConnection, Folder);
define_connection!(PracticeTest, models::PracticeTest, PracticeTestEdge, PracticeTestConnection);

#[cfg(test)]
mod tests {
    use super::*;
    use quizhub_core::cursor::IdKey;
    use quizhub_core::pagination::Connection;
    use uuid::Uuid;

    fn folder(name: &str) -> models::Folder {
        models::Folder {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_connection_conversion_keeps_order_and_cursors() {
        let nodes = vec![folder("a"), folder("b")];
        let expected_end = IdKey::new(nodes[1].id);
        let conn = Connection::build(nodes, true, false, models::Folder::id_key);

        let gql = FolderConnection::from(conn);
        assert_eq!(gql.edges.len(), 2);
        assert_eq!(gql.edges[0].node.0.name, "a");
        assert!(gql.page_info.has_next_page);
        assert_eq!(
            gql.page_info.end_cursor.as_deref(),
            Some(quizhub_core::cursor::CursorKey::encode(&expected_end).as_str())
        );
    }

    #[test]
    fn test_empty_connection_has_no_cursors() {
        let conn: Connection<models::Folder> =
            Connection::build(Vec::new(), false, false, models::Folder::id_key);
        let gql = FolderConnection::from(conn);
        assert!(gql.edges.is_empty());
        assert_eq!(gql.page_info.start_cursor, None);
        assert_eq!(gql.page_info.end_cursor, None);
    }
}
