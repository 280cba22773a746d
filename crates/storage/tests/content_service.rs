//! Content service behaviour over the in-memory adapter.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use quizhub_core::access::Identity;
use quizhub_core::config::Limits;
use quizhub_core::cursor::{CursorKey, RecencyKey};
use quizhub_core::error::ServiceError;
use quizhub_core::models::{
    NewPracticeTest, NewTerm, PracticeTestUpdate, Studyset, StudysetInput, TermProgressUpdate,
    TermUpdate,
};
use quizhub_core::ports::IdentityProvider;
use quizhub_core::services::ContentService;
use quizhub_storage::InMemoryRepositories;

struct Fixture {
    repos: Arc<InMemoryRepositories>,
    service: ContentService,
    alice: Identity,
    bob: Identity,
    moderator: Identity,
}

async fn fixture_with(limits: Limits) -> Fixture {
    let repos = Arc::new(InMemoryRepositories::new());
    let alice = repos.create_user("alice", false).await;
    let bob = repos.create_user("bob", false).await;
    let moderator = repos.create_user("mod", true).await;
    let service = ContentService::new(repos.clone(), limits);

    Fixture {
        repos,
        service,
        alice: Identity::user(alice.id),
        bob: Identity::user(bob.id),
        moderator: Identity::moderator(moderator.id),
    }
}

async fn fixture() -> Fixture {
    fixture_with(Limits::default()).await
}

fn input(title: &str, private: bool) -> StudysetInput {
    StudysetInput {
        title: title.to_string(),
        private,
        subject_id: None,
    }
}

fn owner_id(identity: &Identity) -> Uuid {
    identity.user_id().unwrap()
}

impl Fixture {
    async fn studyset(&self, owner: &Identity, title: &str, private: bool) -> Studyset {
        self.service
            .create_studyset(owner, input(title, private))
            .await
            .unwrap()
    }
}

fn titles(connection: &quizhub_core::pagination::Connection<Studyset>) -> Vec<&str> {
    connection
        .edges
        .iter()
        .map(|e| e.node.title.as_str())
        .collect()
}

// =============================================================================
// Visibility
// =============================================================================

#[tokio::test]
async fn test_private_studyset_visible_to_owner_and_moderator_only() {
    let f = fixture().await;
    let secret = f.studyset(&f.alice, "Secret", true).await;

    assert!(f.service.studyset(&f.alice, secret.id).await.unwrap().is_some());
    assert!(f.service.studyset(&f.moderator, secret.id).await.unwrap().is_some());
    assert!(f.service.studyset(&f.bob, secret.id).await.unwrap().is_none());
    assert!(f
        .service
        .studyset(&Identity::Anonymous, secret.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_missing_and_invisible_studysets_look_the_same() {
    let f = fixture().await;
    let secret = f.studyset(&f.alice, "Secret", true).await;

    let invisible = f.service.studyset(&f.bob, secret.id).await.unwrap();
    let missing = f.service.studyset(&f.bob, Uuid::new_v4()).await.unwrap();
    assert_eq!(invisible, missing);
}

// Test critique: une page filtrée doit rester pleine malgré les lignes privées
#[tokio::test]
async fn test_user_studysets_page_fills_past_hidden_rows() {
    let f = fixture().await;
    for i in 0..3 {
        f.studyset(&f.alice, &format!("Public {i}"), false).await;
    }
    for i in 0..5 {
        f.studyset(&f.alice, &format!("Private {i}"), true).await;
    }

    let page = f
        .service
        .user_studysets(&f.bob, owner_id(&f.alice), true, Some(2), None)
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["Public 2", "Public 1"]);
    assert!(page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);

    let end = page.page_info.end_cursor.as_ref().unwrap().as_str().to_string();
    let rest = f
        .service
        .user_studysets(&f.bob, owner_id(&f.alice), true, Some(2), Some(&end))
        .await
        .unwrap();
    assert_eq!(titles(&rest), vec!["Public 0"]);
    assert!(!rest.page_info.has_next_page);
    assert!(rest.page_info.has_previous_page);
}

#[tokio::test]
async fn test_owner_sees_private_studysets_in_own_listing() {
    let f = fixture().await;
    f.studyset(&f.alice, "Public", false).await;
    f.studyset(&f.alice, "Private", true).await;

    let own = f
        .service
        .user_studysets(&f.alice, owner_id(&f.alice), true, None, None)
        .await
        .unwrap();
    assert_eq!(titles(&own), vec!["Private", "Public"]);

    let public_only = f
        .service
        .user_studysets(&f.alice, owner_id(&f.alice), false, None, None)
        .await
        .unwrap();
    assert_eq!(titles(&public_only), vec!["Public"]);
}

#[tokio::test]
async fn test_pages_walk_without_gaps_or_duplicates() {
    let f = fixture().await;
    for i in 0..7 {
        f.studyset(&f.alice, &format!("Set {i}"), i % 3 == 0).await;
    }

    let mut seen = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let page = f
            .service
            .recent_studysets(&Identity::Anonymous, Some(2), after.as_deref())
            .await
            .unwrap();
        seen.extend(page.edges.iter().map(|e| e.node.title.clone()));
        if !page.page_info.has_next_page {
            break;
        }
        after = page.page_info.end_cursor.map(|c| c.as_str().to_string());
    }

    assert_eq!(seen, vec!["Set 5", "Set 4", "Set 2", "Set 1"]);
}

#[tokio::test]
async fn test_invalid_cursor_restarts_from_first_page() {
    let f = fixture().await;
    f.studyset(&f.alice, "Only", false).await;

    let page = f
        .service
        .recent_studysets(&Identity::Anonymous, None, Some("!!not a cursor!!"))
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["Only"]);
    assert!(!page.page_info.has_previous_page);
}

// Test critique: un curseur valide sans ligne correspondante n'annonce pas de page précédente
#[tokio::test]
async fn test_cursor_without_matching_row_reports_no_previous_page() {
    let f = fixture().await;
    let only = f.studyset(&f.alice, "Only", false).await;

    let dangling = RecencyKey::new(chrono::Utc::now() + chrono::Duration::days(365), Uuid::new_v4())
        .encode();
    let page = f
        .service
        .recent_studysets(&Identity::Anonymous, Some(5), Some(dangling.as_str()))
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["Only"]);
    assert!(!page.page_info.has_previous_page);

    let anchored = only.recency_key().encode();
    let page = f
        .service
        .recent_studysets(&Identity::Anonymous, Some(5), Some(anchored.as_str()))
        .await
        .unwrap();
    assert!(page.is_empty());
    assert!(page.page_info.has_previous_page);
}

#[tokio::test]
async fn test_folder_cursor_is_rejected_by_studyset_listing() {
    let f = fixture().await;
    f.studyset(&f.alice, "First", false).await;
    f.studyset(&f.alice, "Second", false).await;
    f.service.create_folder(&f.alice, "Folder").await.unwrap();

    let folders = f.service.my_folders(&f.alice, None, None).await.unwrap();
    let folder_cursor = folders.page_info.end_cursor.unwrap();

    let page = f
        .service
        .recent_studysets(&f.alice, None, Some(folder_cursor.as_str()))
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["Second", "First"]);
}

#[tokio::test]
async fn test_page_size_out_of_range_is_rejected() {
    let f = fixture().await;

    for first in [0, -1, 101] {
        let result = f
            .service
            .recent_studysets(&Identity::Anonymous, Some(first), None)
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))), "first = {first}");
    }
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_moderator_cannot_edit_others_studyset() {
    let f = fixture().await;
    let set = f.studyset(&f.alice, "Mine", false).await;

    let result = f
        .service
        .update_studyset(&f.moderator, set.id, input("Hijacked", false))
        .await;
    assert!(matches!(result, Err(ServiceError::Unauthorized)));
    assert!(!f.service.can_edit(&f.moderator, &set));
    assert!(f.service.can_edit(&f.alice, &set));
}

#[tokio::test]
async fn test_mutating_missing_or_foreign_studyset_is_uniformly_unauthorized() {
    let f = fixture().await;
    let set = f.studyset(&f.alice, "Mine", false).await;

    let foreign = f.service.delete_studyset(&f.bob, set.id).await;
    let missing = f.service.delete_studyset(&f.bob, Uuid::new_v4()).await;
    assert!(matches!(foreign, Err(ServiceError::Unauthorized)));
    assert!(matches!(missing, Err(ServiceError::Unauthorized)));

    assert_eq!(f.service.delete_studyset(&f.alice, set.id).await.unwrap(), set.id);
    assert!(f.service.studyset(&f.alice, set.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_anonymous_cannot_create() {
    let f = fixture().await;
    let result = f
        .service
        .create_studyset(&Identity::Anonymous, input("Nope", false))
        .await;
    assert!(matches!(result, Err(ServiceError::Unauthorized)));
}

#[tokio::test]
async fn test_validation_runs_before_authorization() {
    let f = fixture().await;
    let result = f
        .service
        .create_studyset(&Identity::Anonymous, input("", false))
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

// =============================================================================
// Terms
// =============================================================================

fn new_term(term: &str, sort_order: i32) -> NewTerm {
    NewTerm {
        term: term.to_string(),
        def: format!("{term} definition"),
        sort_order,
    }
}

#[tokio::test]
async fn test_terms_follow_parent_studyset() {
    let f = fixture().await;
    let set = f.studyset(&f.alice, "Vocab", true).await;
    let created = f
        .service
        .create_terms(&f.alice, set.id, vec![new_term("b", 1), new_term("a", 0)])
        .await
        .unwrap();

    let terms = f.service.studyset_terms(&f.alice, &set).await.unwrap();
    assert_eq!(terms.iter().map(|t| t.term.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(f.service.terms_count(&f.alice, &set).await.unwrap(), 2);

    assert!(f.service.term(&f.bob, created[0].id).await.unwrap().is_none());
    assert!(f.service.term(&f.moderator, created[0].id).await.unwrap().is_some());
    assert!(f.service.studyset_terms(&f.bob, &set).await.unwrap().is_empty());

    let denied = f
        .service
        .create_terms(&f.bob, set.id, vec![new_term("c", 2)])
        .await;
    assert!(matches!(denied, Err(ServiceError::Unauthorized)));
}

#[tokio::test]
async fn test_term_updates_and_deletes_are_scoped_to_studyset() {
    let f = fixture().await;
    let set = f.studyset(&f.alice, "Vocab", false).await;
    let other = f.studyset(&f.alice, "Other", false).await;
    let term = f
        .service
        .create_terms(&f.alice, set.id, vec![new_term("a", 0)])
        .await
        .unwrap()
        .remove(0);

    let updated = f
        .service
        .update_terms(
            &f.alice,
            set.id,
            vec![TermUpdate {
                id: term.id,
                term: None,
                def: Some("changed".into()),
                sort_order: None,
            }],
        )
        .await
        .unwrap();
    assert_eq!(updated[0].def, "changed");
    assert_eq!(updated[0].term, "a");

    let wrong_parent = f
        .service
        .delete_terms(&f.alice, other.id, vec![term.id])
        .await
        .unwrap();
    assert!(wrong_parent.is_empty());

    let deleted = f
        .service
        .delete_terms(&f.alice, set.id, vec![term.id])
        .await
        .unwrap();
    assert_eq!(deleted, vec![term.id]);
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_whole() {
    let limits = Limits {
        max_batch_mutation_size: 2,
        ..Limits::default()
    };
    let f = fixture_with(limits).await;
    let set = f.studyset(&f.alice, "Vocab", false).await;

    let result = f
        .service
        .create_terms(
            &f.alice,
            set.id,
            vec![new_term("a", 0), new_term("b", 1), new_term("c", 2)],
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert_eq!(f.service.terms_count(&f.alice, &set).await.unwrap(), 0);
}

// =============================================================================
// Folders and saved studysets
// =============================================================================

#[tokio::test]
async fn test_folder_membership_flow() {
    let f = fixture().await;
    let folder = f.service.create_folder(&f.alice, "Biology").await.unwrap();
    let own = f.studyset(&f.alice, "Cells", false).await;
    let public = f.studyset(&f.bob, "Plants", false).await;
    let private = f.studyset(&f.bob, "Diary", true).await;

    assert!(f.service.set_studyset_folder(&f.alice, own.id, folder.id).await.unwrap());
    assert!(f.service.set_studyset_folder(&f.alice, public.id, folder.id).await.unwrap());
    let denied = f
        .service
        .set_studyset_folder(&f.alice, private.id, folder.id)
        .await;
    assert!(matches!(denied, Err(ServiceError::Unauthorized)));

    let contents = f.service.folder_studysets(&f.alice, &folder).await.unwrap();
    assert_eq!(contents.len(), 2);
    assert_eq!(
        f.service.studyset_folder(&f.alice, &own).await.unwrap(),
        Some(folder.clone())
    );
    assert_eq!(f.service.studyset_folder(&Identity::Anonymous, &own).await.unwrap(), None);

    assert!(f.service.remove_studyset_from_folder(&f.alice, own.id).await.unwrap());
    assert!(f.service.remove_studyset_from_folder(&f.alice, own.id).await.unwrap());
    assert_eq!(f.service.folder_studysets(&f.alice, &folder).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_folders_are_private_to_owner() {
    let f = fixture().await;
    let folder = f.service.create_folder(&f.alice, "Mine").await.unwrap();

    assert!(f.service.folder(&f.bob, folder.id).await.unwrap().is_none());
    assert!(f.service.folder(&f.moderator, folder.id).await.unwrap().is_some());

    let rename = f.service.rename_folder(&f.bob, folder.id, "Theirs").await;
    assert!(matches!(rename, Err(ServiceError::Unauthorized)));
    let moderator_rename = f.service.rename_folder(&f.moderator, folder.id, "Mod").await;
    assert!(matches!(moderator_rename, Err(ServiceError::Unauthorized)));

    let renamed = f.service.rename_folder(&f.alice, folder.id, "Renamed").await.unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(f.service.delete_folder(&f.alice, folder.id).await.unwrap(), folder.id);
}

#[tokio::test]
async fn test_saved_studysets_hide_rows_that_turned_private() {
    let f = fixture().await;
    let first = f.studyset(&f.bob, "First", false).await;
    let second = f.studyset(&f.bob, "Second", false).await;

    f.service.save_studyset(&f.alice, first.id).await.unwrap();
    f.service.save_studyset(&f.alice, second.id).await.unwrap();
    assert!(f.service.is_saved(&f.alice, &first).await.unwrap());
    assert!(!f.service.is_saved(&Identity::Anonymous, &first).await.unwrap());

    f.service
        .update_studyset(&f.bob, second.id, input("Second", true))
        .await
        .unwrap();

    let saved = f.service.my_saved_studysets(&f.alice, None, None).await.unwrap();
    let ids: Vec<Uuid> = saved.edges.iter().map(|e| e.node.studyset.id).collect();
    assert_eq!(ids, vec![first.id]);

    assert!(f.service.unsave_studyset(&f.alice, first.id).await.unwrap());
    assert!(!f.service.is_saved(&f.alice, &first).await.unwrap());
}

#[tokio::test]
async fn test_cannot_save_unreadable_studyset() {
    let f = fixture().await;
    let private = f.studyset(&f.bob, "Diary", true).await;
    let result = f.service.save_studyset(&f.alice, private.id).await;
    assert!(matches!(result, Err(ServiceError::Unauthorized)));
}

// =============================================================================
// Learning records
// =============================================================================

#[tokio::test]
async fn test_progress_is_personal_without_moderator_override() {
    let f = fixture().await;
    let set = f.studyset(&f.bob, "Shared", false).await;
    let term = f
        .service
        .create_terms(&f.bob, set.id, vec![new_term("a", 0)])
        .await
        .unwrap()
        .remove(0);

    let update = TermProgressUpdate {
        term_id: term.id,
        term_correct_increase: 1,
        term_leitner_system_box: Some(2),
        ..Default::default()
    };
    f.service
        .update_term_progress(&f.alice, vec![update.clone()])
        .await
        .unwrap();
    let progress = f
        .service
        .update_term_progress(&f.alice, vec![update])
        .await
        .unwrap();
    assert_eq!(progress[0].term_correct_count, 2);

    assert!(f.service.term_progress(&f.alice, &term).await.unwrap().is_some());
    assert!(f.service.term_progress(&f.bob, &term).await.unwrap().is_none());
    assert!(f.service.term_progress(&f.moderator, &term).await.unwrap().is_none());
}

#[tokio::test]
async fn test_progress_rejects_negative_and_unreadable_terms() {
    let f = fixture().await;
    let private = f.studyset(&f.bob, "Diary", true).await;
    let term = f
        .service
        .create_terms(&f.bob, private.id, vec![new_term("a", 0)])
        .await
        .unwrap()
        .remove(0);

    let negative = f
        .service
        .update_term_progress(
            &f.bob,
            vec![TermProgressUpdate {
                term_id: term.id,
                def_incorrect_increase: -1,
                ..Default::default()
            }],
        )
        .await;
    assert!(matches!(negative, Err(ServiceError::Validation(_))));

    let unreadable = f
        .service
        .update_term_progress(
            &f.alice,
            vec![TermProgressUpdate {
                term_id: term.id,
                term_correct_increase: 1,
                ..Default::default()
            }],
        )
        .await;
    assert!(matches!(unreadable, Err(ServiceError::Unauthorized)));
}

#[tokio::test]
async fn test_practice_tests_are_personal() {
    let f = fixture().await;
    let set = f.studyset(&f.bob, "Quiz", false).await;

    let test = f
        .service
        .record_practice_test(
            &f.alice,
            NewPracticeTest {
                studyset_id: set.id,
                questions_correct: 3,
                questions_total: 5,
                questions: json!([{ "type": "multiple_choice" }]),
            },
        )
        .await
        .unwrap();

    assert!(f.service.practice_test(&f.alice, test.id).await.unwrap().is_some());
    assert!(f.service.practice_test(&f.bob, test.id).await.unwrap().is_none());
    assert!(f.service.practice_test(&f.moderator, test.id).await.unwrap().is_none());

    let mine = f
        .service
        .my_practice_tests(&f.alice, Some(set.id), None, None)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    let update = PracticeTestUpdate {
        id: test.id,
        questions_correct: 4,
        questions_total: 5,
        questions: json!([]),
    };
    let foreign = f.service.update_practice_test(&f.bob, update.clone()).await;
    assert!(matches!(foreign, Err(ServiceError::Unauthorized)));
    let updated = f.service.update_practice_test(&f.alice, update).await.unwrap();
    assert_eq!(updated.questions_correct, 4);
}

#[tokio::test]
async fn test_practice_test_score_must_be_consistent() {
    let f = fixture().await;
    let set = f.studyset(&f.alice, "Quiz", false).await;

    let result = f
        .service
        .record_practice_test(
            &f.alice,
            NewPracticeTest {
                studyset_id: set.id,
                questions_correct: 6,
                questions_total: 5,
                questions: json!([]),
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

// =============================================================================
// Search and identity
// =============================================================================

#[tokio::test]
async fn test_search_ranks_and_paginates_public_hits() {
    let f = fixture().await;
    f.studyset(&f.alice, "cells", false).await;
    f.studyset(&f.alice, "plant cells", false).await;
    f.studyset(&f.alice, "animal cells and tissues", false).await;
    f.studyset(&f.alice, "secret cells", true).await;
    f.studyset(&f.alice, "chemistry", false).await;

    let first = f
        .service
        .search_studysets(&f.alice, "cells", None, Some(2), None)
        .await
        .unwrap();
    let titles: Vec<&str> = first.edges.iter().map(|e| e.node.studyset.title.as_str()).collect();
    assert_eq!(titles, vec!["cells", "plant cells"]);
    assert!(first.page_info.has_next_page);

    let end = first.page_info.end_cursor.unwrap();
    let second = f
        .service
        .search_studysets(&f.alice, "cells", None, Some(2), Some(end.as_str()))
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second.edges[0].node.studyset.title, "animal cells and tissues");

    let blank = f.service.search_studysets(&f.alice, "  ", None, None, None).await;
    assert!(matches!(blank, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_session_tokens_resolve_to_identity() {
    let f = fixture().await;
    let token = f
        .repos
        .create_session(owner_id(&f.moderator), Duration::from_secs(3600))
        .await;

    assert_eq!(f.repos.resolve(Some(&token)).await.unwrap(), f.moderator);
}
