//! End-to-end GraphQL scenarios against the in-memory adapter.

use std::sync::Arc;

use async_graphql::{Request, Variables};
use serde_json::{json, Value};
use uuid::Uuid;

use quizhub_core::access::Identity;
use quizhub_core::config::Limits;
use quizhub_core::ports::FolderRepository;
use quizhub_core::services::ContentService;
use quizhub_graphql::{build_schema, QuizhubSchema, CODE_UNAUTHORIZED, CODE_VALIDATION_FAILED};
use quizhub_storage::InMemoryRepositories;

struct Harness {
    repos: Arc<InMemoryRepositories>,
    schema: QuizhubSchema,
}

impl Harness {
    async fn new() -> Self {
        let repos = Arc::new(InMemoryRepositories::new());
        let service = ContentService::new(repos.clone(), Limits::default());
        Self {
            schema: build_schema(service),
            repos,
        }
    }

    async fn user(&self, name: &str) -> Identity {
        let user = self.repos.create_user(name, false).await;
        Identity::user(user.id)
    }

    async fn moderator(&self, name: &str) -> Identity {
        let user = self.repos.create_user(name, true).await;
        Identity::moderator(user.id)
    }

    async fn run(&self, identity: Identity, query: &str, variables: Value) -> Value {
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(identity);
        serde_json::to_value(self.schema.execute(request).await).unwrap()
    }

    /// Run and assert the response carries no errors.
    async fn ok(&self, identity: Identity, query: &str, variables: Value) -> Value {
        let response = self.run(identity, query, variables).await;
        assert!(
            response.get("errors").is_none(),
            "unexpected errors: {}",
            response["errors"]
        );
        response["data"].clone()
    }

    async fn create_studyset(&self, owner: Identity, title: &str, private: bool) -> String {
        let data = self
            .ok(
                owner,
                "mutation($input: StudysetInput!) { createStudyset(studyset: $input) { id } }",
                json!({ "input": { "title": title, "private": private } }),
            )
            .await;
        data["createStudyset"]["id"].as_str().unwrap().to_string()
    }

    async fn create_term(&self, owner: Identity, studyset_id: &str) -> String {
        let data = self
            .ok(
                owner,
                "mutation($sid: ID!, $terms: [NewTermInput!]!) {
                    createTerms(studysetId: $sid, terms: $terms) { id }
                }",
                json!({ "sid": studyset_id, "terms": [{ "term": "cell", "def": "unit of life", "sortOrder": 0 }] }),
            )
            .await;
        data["createTerms"][0]["id"].as_str().unwrap().to_string()
    }
}

fn error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_authed_requires_identity() {
    let h = Harness::new().await;

    let anonymous = h.run(Identity::Anonymous, "{ authed }", json!({})).await;
    assert_eq!(error_code(&anonymous), Some(CODE_UNAUTHORIZED));

    let alice = h.user("alice").await;
    let data = h.ok(alice, "{ authed }", json!({})).await;
    assert_eq!(data["authed"], json!(true));
}

#[tokio::test]
async fn test_term_mutations_without_auth_fail() {
    let h = Harness::new().await;

    for query in [
        r#"mutation { createTerms(studysetId: "123", terms: [{term: "X", def: "Y", sortOrder: 0}]) { id } }"#,
        r#"mutation { updateTerms(studysetId: "123", terms: [{id: "1", term: "X", def: "Y", sortOrder: 0}]) { id } }"#,
        r#"mutation { deleteTerms(studysetId: "123", ids: ["1"]) }"#,
    ] {
        let response = h.run(Identity::Anonymous, query, json!({})).await;
        assert!(response.get("errors").is_some(), "{query} should fail");
    }
}

// =============================================================================
// Studysets
// =============================================================================

// Test critique: seul le propriétaire peut renommer un studyset privé
#[tokio::test]
async fn test_owner_mutation_scenario() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let id = h.create_studyset(alice, "Draft", true).await;

    let rename = "mutation($id: ID!, $input: StudysetInput!) {
        updateStudyset(id: $id, studyset: $input) { title private }
    }";
    let vars = json!({ "id": id, "input": { "title": "Renamed", "private": true } });

    let data = h.ok(alice, rename, vars.clone()).await;
    assert_eq!(data["updateStudyset"]["title"], "Renamed");

    let denied = h.run(bob, rename, vars).await;
    assert_eq!(error_code(&denied), Some(CODE_UNAUTHORIZED));
    assert_eq!(denied["data"], Value::Null);
}

#[tokio::test]
async fn test_private_studyset_resolves_to_null_for_others() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let moderator = h.moderator("mod").await;
    let id = h.create_studyset(alice, "Secret", true).await;

    let query = "query($id: ID!) { studyset(id: $id) { title canEdit } }";

    let data = h.ok(bob, query, json!({ "id": id })).await;
    assert_eq!(data["studyset"], Value::Null);

    let data = h.ok(Identity::Anonymous, query, json!({ "id": id })).await;
    assert_eq!(data["studyset"], Value::Null);

    let data = h.ok(moderator, query, json!({ "id": id })).await;
    assert_eq!(data["studyset"]["title"], "Secret");
    assert_eq!(data["studyset"]["canEdit"], json!(false));

    let data = h.ok(alice, query, json!({ "id": id })).await;
    assert_eq!(data["studyset"]["canEdit"], json!(true));
}

#[tokio::test]
async fn test_user_studysets_visibility_scenario() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    h.create_studyset(alice, "Public", false).await;
    h.create_studyset(alice, "Private", true).await;
    let alice_id = alice.user_id().unwrap().to_string();

    let query = "query($userId: ID!, $includePrivate: Boolean!) {
        user(id: $userId) {
            username
            studysets(includePrivate: $includePrivate) { edges { node { title } } }
        }
    }";
    let titles = |data: &Value| -> Vec<String> {
        data["user"]["studysets"]["edges"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["node"]["title"].as_str().unwrap().to_string())
            .collect()
    };

    let anonymous = h
        .ok(Identity::Anonymous, query, json!({ "userId": alice_id, "includePrivate": false }))
        .await;
    assert_eq!(titles(&anonymous), vec!["Public"]);
    assert_eq!(anonymous["user"]["username"], "alice");

    let own = h
        .ok(alice, query, json!({ "userId": alice_id, "includePrivate": true }))
        .await;
    assert_eq!(titles(&own), vec!["Private", "Public"]);

    let other = h
        .ok(bob, query, json!({ "userId": alice_id, "includePrivate": true }))
        .await;
    assert_eq!(titles(&other), vec!["Public"]);
}

#[tokio::test]
async fn test_recent_feed_paginates_with_opaque_cursors() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    for i in 0..3 {
        h.create_studyset(alice, &format!("Set {i}"), false).await;
    }

    let query = "query($after: String) {
        recentStudysets(first: 2, after: $after) {
            edges { node { title } cursor }
            pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
        }
    }";

    let first = h.ok(Identity::Anonymous, query, json!({ "after": null })).await;
    let page = &first["recentStudysets"];
    assert_eq!(page["edges"].as_array().unwrap().len(), 2);
    assert_eq!(page["pageInfo"]["hasNextPage"], json!(true));
    assert_eq!(page["pageInfo"]["hasPreviousPage"], json!(false));
    assert_eq!(page["pageInfo"]["endCursor"], page["edges"][1]["cursor"]);

    let end = page["pageInfo"]["endCursor"].clone();
    let second = h.ok(Identity::Anonymous, query, json!({ "after": end })).await;
    let page = &second["recentStudysets"];
    assert_eq!(page["edges"][0]["node"]["title"], "Set 0");
    assert_eq!(page["pageInfo"]["hasNextPage"], json!(false));
    assert_eq!(page["pageInfo"]["hasPreviousPage"], json!(true));
}

#[tokio::test]
async fn test_first_out_of_range_is_a_validation_error() {
    let h = Harness::new().await;
    let response = h
        .run(
            Identity::Anonymous,
            "{ recentStudysets(first: 1000) { edges { cursor } } }",
            json!({}),
        )
        .await;
    assert_eq!(error_code(&response), Some(CODE_VALIDATION_FAILED));
}

#[tokio::test]
async fn test_delete_studyset_returns_id() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let id = h.create_studyset(alice, "Doomed", false).await;

    let data = h
        .ok(alice, "mutation($id: ID!) { deleteStudyset(id: $id) }", json!({ "id": id }))
        .await;
    assert_eq!(data["deleteStudyset"], json!(id));

    let again = h
        .run(alice, "mutation($id: ID!) { deleteStudyset(id: $id) }", json!({ "id": id }))
        .await;
    assert_eq!(error_code(&again), Some(CODE_UNAUTHORIZED));
}

// =============================================================================
// Terms and progress
// =============================================================================

#[tokio::test]
async fn test_terms_nested_under_studyset() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let id = h.create_studyset(alice, "Biology", false).await;
    h.create_term(alice, &id).await;

    let data = h
        .ok(
            Identity::Anonymous,
            "query($id: ID!) { studyset(id: $id) { termsCount terms { term def } } }",
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["studyset"]["termsCount"], json!(1));
    assert_eq!(data["studyset"]["terms"][0]["def"], "unit of life");
}

// Test critique: la progression d'un utilisateur n'est jamais visible par un autre
#[tokio::test]
async fn test_progress_isolation_scenario() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let studyset_id = h.create_studyset(alice, "Public Set for Progress", false).await;
    let term_id = h.create_term(alice, &studyset_id).await;

    let update = "mutation($input: [TermProgressInput!]!) {
        updateTermProgress(termProgress: $input) { termLeitnerSystemBox termCorrectCount }
    }";
    let data = h
        .ok(
            bob,
            update,
            json!({ "input": [{ "termId": term_id, "termCorrectIncrease": 1, "termLeitnerSystemBox": 1 }] }),
        )
        .await;
    assert_eq!(data["updateTermProgress"][0]["termCorrectCount"], json!(1));
    assert_eq!(data["updateTermProgress"][0]["termLeitnerSystemBox"], json!(1));

    let query = "query($id: ID!) { term(id: $id) { progress { termCorrectCount } } }";
    let as_owner = h.ok(alice, query, json!({ "id": term_id })).await;
    assert_eq!(as_owner["term"]["progress"], Value::Null);

    let as_bob = h.ok(bob, query, json!({ "id": term_id })).await;
    assert_eq!(as_bob["term"]["progress"]["termCorrectCount"], json!(1));
}

// =============================================================================
// Folders and saved studysets
// =============================================================================

// Test critique: la visibilité est vérifiée au moment de la mutation uniquement
#[tokio::test]
async fn test_folder_visibility_interaction_scenario() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let shared = h.create_studyset(alice, "Shared Studyset", false).await;
    let other = h.create_studyset(alice, "Other Studyset", false).await;

    let folder = h
        .ok(bob, "mutation { createFolder(name: \"Borrowed\") { id name } }", json!({}))
        .await;
    let folder_id = folder["createFolder"]["id"].as_str().unwrap().to_string();

    let set_folder = "mutation($studysetId: ID!, $folderId: ID!) {
        setStudysetFolder(studysetId: $studysetId, folderId: $folderId)
    }";
    let data = h
        .ok(bob, set_folder, json!({ "studysetId": shared, "folderId": folder_id }))
        .await;
    assert_eq!(data["setStudysetFolder"], json!(true));

    let make_private = "mutation($id: ID!, $input: StudysetInput!) {
        updateStudyset(id: $id, studyset: $input) { id }
    }";
    for (id, title) in [(&shared, "Shared Studyset"), (&other, "Other Studyset")] {
        h.ok(alice, make_private, json!({ "id": id, "input": { "title": title, "private": true } }))
            .await;
    }

    let denied = h
        .run(bob, set_folder, json!({ "studysetId": other, "folderId": folder_id }))
        .await;
    assert_eq!(error_code(&denied), Some(CODE_UNAUTHORIZED));

    let folder_query = "query($id: ID!) { folder(id: $id) { name studysets { id } } }";
    let data = h.ok(bob, folder_query, json!({ "id": folder_id })).await;
    assert_eq!(data["folder"]["name"], "Borrowed");
    // The membership survives; the now-private member is simply not readable.
    assert_eq!(data["folder"]["studysets"], json!([]));
    let membership = h
        .repos
        .get_studyset_folder(bob.user_id().unwrap(), Uuid::parse_str(&shared).unwrap())
        .await
        .unwrap();
    assert_eq!(membership.map(|f| f.id.to_string()), Some(folder_id.clone()));

    let anonymous = h.ok(Identity::Anonymous, folder_query, json!({ "id": folder_id })).await;
    assert_eq!(anonymous["folder"], Value::Null);
}

#[tokio::test]
async fn test_folder_lifecycle() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let studyset_id = h.create_studyset(alice, "Folder Test Studyset", false).await;

    let created = h
        .ok(alice, "mutation($name: String!) { createFolder(name: $name) { id } }", json!({ "name": "Mine" }))
        .await;
    let folder_id = created["createFolder"]["id"].as_str().unwrap().to_string();

    h.ok(
        alice,
        "mutation($s: ID!, $f: ID!) { setStudysetFolder(studysetId: $s, folderId: $f) }",
        json!({ "s": studyset_id, "f": folder_id }),
    )
    .await;
    let nested = h
        .ok(alice, "query($id: ID!) { studyset(id: $id) { folder { id } } }", json!({ "id": studyset_id }))
        .await;
    assert_eq!(nested["studyset"]["folder"]["id"], json!(folder_id));

    let mine = h.ok(alice, "{ myFolders { edges { node { name } } } }", json!({})).await;
    assert_eq!(mine["myFolders"]["edges"][0]["node"]["name"], "Mine");

    let rename = "mutation($id: ID!, $name: String!) { renameFolder(id: $id, name: $name) { name } }";
    let denied = h.run(bob, rename, json!({ "id": folder_id, "name": "Theirs" })).await;
    assert_eq!(error_code(&denied), Some(CODE_UNAUTHORIZED));
    let too_long = h
        .run(alice, rename, json!({ "id": folder_id, "name": "x".repeat(1001) }))
        .await;
    assert_eq!(error_code(&too_long), Some(CODE_VALIDATION_FAILED));
    let renamed = h.ok(alice, rename, json!({ "id": folder_id, "name": "Renamed" })).await;
    assert_eq!(renamed["renameFolder"]["name"], "Renamed");

    let removed = h
        .ok(
            alice,
            "mutation($s: ID!) { removeStudysetFromFolder(studysetId: $s) }",
            json!({ "s": studyset_id }),
        )
        .await;
    assert_eq!(removed["removeStudysetFromFolder"], json!(true));

    let deleted = h
        .ok(alice, "mutation($id: ID!) { deleteFolder(id: $id) }", json!({ "id": folder_id }))
        .await;
    assert_eq!(deleted["deleteFolder"], json!(folder_id));
}

#[tokio::test]
async fn test_saved_studyset_flow() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let id = h.create_studyset(alice, "Save Test Studyset", false).await;

    let save = h
        .ok(bob, "mutation($s: ID!) { saveStudyset(studysetId: $s) }", json!({ "s": id }))
        .await;
    assert_eq!(save["saveStudyset"], json!(true));

    let saved_flag = "query($id: ID!) { studyset(id: $id) { saved } }";
    let data = h.ok(bob, saved_flag, json!({ "id": id })).await;
    assert_eq!(data["studyset"]["saved"], json!(true));
    let data = h.ok(alice, saved_flag, json!({ "id": id })).await;
    assert_eq!(data["studyset"]["saved"], json!(false));

    let mine = h
        .ok(bob, "{ mySavedStudysets { edges { node { id } } } }", json!({}))
        .await;
    assert_eq!(mine["mySavedStudysets"]["edges"][0]["node"]["id"], json!(id));

    h.ok(bob, "mutation($s: ID!) { unsaveStudyset(studysetId: $s) }", json!({ "s": id }))
        .await;
    let data = h.ok(bob, saved_flag, json!({ "id": id })).await;
    assert_eq!(data["studyset"]["saved"], json!(false));

    let anonymous = h
        .run(Identity::Anonymous, "mutation { saveStudyset(studysetId: \"123\") }", json!({}))
        .await;
    assert!(anonymous.get("errors").is_some());
}

// =============================================================================
// Practice tests
// =============================================================================

#[tokio::test]
async fn test_practice_test_flow() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let public = h.create_studyset(alice, "Public Set for PT", false).await;
    let private = h.create_studyset(alice, "Private Set", true).await;

    let record = "mutation($input: PracticeTestInput!) {
        recordPracticeTest(input: $input) { id questionsCorrect questionsTotal studyset { title } }
    }";
    let data = h
        .ok(
            bob,
            record,
            json!({ "input": { "studysetId": public, "questionsCorrect": 8, "questionsTotal": 10, "questions": [] } }),
        )
        .await;
    let test_id = data["recordPracticeTest"]["id"].as_str().unwrap().to_string();
    assert_eq!(data["recordPracticeTest"]["studyset"]["title"], "Public Set for PT");

    let update = "mutation($input: PracticeTestInput!) {
        updatePracticeTest(input: $input) { id questionsCorrect }
    }";
    let vars = json!({ "input": { "id": test_id, "questionsCorrect": 9, "questionsTotal": 10, "questions": [] } });
    let data = h.ok(bob, update, vars.clone()).await;
    assert_eq!(data["updatePracticeTest"]["questionsCorrect"], json!(9));

    let denied = h.run(alice, update, vars).await;
    assert_eq!(error_code(&denied), Some(CODE_UNAUTHORIZED));

    let on_private = h
        .run(
            bob,
            record,
            json!({ "input": { "studysetId": private, "questionsCorrect": 1, "questionsTotal": 1, "questions": [] } }),
        )
        .await;
    assert_eq!(error_code(&on_private), Some(CODE_UNAUTHORIZED));

    let by_id = "query($id: ID!) { practiceTest(id: $id) { questionsCorrect } }";
    let data = h.ok(alice, by_id, json!({ "id": test_id })).await;
    assert_eq!(data["practiceTest"], Value::Null);

    let mine = h
        .ok(bob, "{ myPracticeTests { edges { node { id } } } }", json!({}))
        .await;
    assert_eq!(mine["myPracticeTests"]["edges"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_returns_public_hits_only() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    h.create_studyset(alice, "Cell biology", false).await;
    h.create_studyset(alice, "Cell secrets", true).await;
    h.create_studyset(alice, "Organic chemistry", false).await;

    let data = h
        .ok(
            alice,
            "{ searchStudysets(query: \"cell\") { edges { node { title } } } }",
            json!({}),
        )
        .await;
    let edges = data["searchStudysets"]["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["node"]["title"], "Cell biology");

    let blank = h
        .run(alice, "{ searchStudysets(query: \"  \") { edges { cursor } } }", json!({}))
        .await;
    assert_eq!(error_code(&blank), Some(CODE_VALIDATION_FAILED));
}
