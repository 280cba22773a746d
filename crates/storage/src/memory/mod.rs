//! In-memory storage adapter.
//!
//! Implements every repository port plus [`IdentityProvider`] over a single
//! `RwLock`-guarded state. Orders and keyset semantics match the PostgreSQL
//! adapter, so the same service code can be exercised without a database.
//! Used by tests and by the binary's `--ephemeral` mode.

mod search;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use quizhub_core::access::Identity;
use quizhub_core::cursor::{IdKey, RankedKey, RecencyKey};
use quizhub_core::error::{StorageError, StorageResult};
use quizhub_core::models::{
    Folder, NewPracticeTest, NewTerm, PracticeTest, PracticeTestUpdate, RankedStudyset,
    SavedStudyset, Studyset, StudysetInput, Term, TermProgress, TermProgressUpdate, TermUpdate,
    User,
};
use quizhub_core::ports::{
    FolderRepository, IdentityProvider, PracticeTestRepository, ProgressRepository, Repositories,
    SavedStudysetRepository, StudysetRepository, TermRepository, UserRepository,
};

use search::{rank, ranked_after, ranked_desc};

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct State {
    last_timestamp: Option<DateTime<Utc>>,
    users: HashMap<Uuid, User>,
    /// token -> (user, expiry)
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    studysets: HashMap<Uuid, Studyset>,
    terms: HashMap<Uuid, Term>,
    folders: HashMap<Uuid, Folder>,
    /// (user, studyset) -> folder
    memberships: HashMap<(Uuid, Uuid), Uuid>,
    /// (user, studyset) -> saved_at
    saved: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    /// (user, term) -> progress
    progress: HashMap<(Uuid, Uuid), TermProgress>,
    practice_tests: HashMap<Uuid, PracticeTest>,
}

impl State {
    /// Strictly increasing wall clock, at database (microsecond) precision.
    fn now(&mut self) -> DateTime<Utc> {
        let now = truncate_micros(Utc::now());
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn touch_studyset(&mut self, id: Uuid) {
        let now = self.now();
        if let Some(studyset) = self.studysets.get_mut(&id) {
            studyset.updated_at = now;
        }
    }

    fn remove_terms(&mut self, ids: &[Uuid]) {
        for id in ids {
            self.terms.remove(id);
        }
        self.progress.retain(|(_, term_id), _| !ids.contains(term_id));
    }
}

fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    let micros = ts.timestamp_subsec_micros();
    ts.with_nanosecond(micros * 1_000).unwrap_or(ts)
}

/// Add one update to a progress row; counters that would overflow are rejected.
fn accumulate(
    mut progress: TermProgress,
    update: &TermProgressUpdate,
    now: DateTime<Utc>,
) -> StorageResult<TermProgress> {
    let add = |count: i32, increase: i32, column: &str| {
        count.checked_add(increase).ok_or_else(|| {
            StorageError::ConstraintViolation(format!(
                "{column} overflows for term {}",
                update.term_id
            ))
        })
    };
    progress.term_correct_count = add(
        progress.term_correct_count,
        update.term_correct_increase,
        "term_correct_count",
    )?;
    progress.term_incorrect_count = add(
        progress.term_incorrect_count,
        update.term_incorrect_increase,
        "term_incorrect_count",
    )?;
    progress.def_correct_count = add(
        progress.def_correct_count,
        update.def_correct_increase,
        "def_correct_count",
    )?;
    progress.def_incorrect_count = add(
        progress.def_incorrect_count,
        update.def_incorrect_increase,
        "def_incorrect_count",
    )?;
    progress.timestamp = now;
    if update.term_leitner_system_box.is_some() {
        progress.term_leitner_system_box = update.term_leitner_system_box;
    }
    if update.def_leitner_system_box.is_some() {
        progress.def_leitner_system_box = update.def_leitner_system_box;
    }
    Ok(progress)
}

fn recency_after(timestamp: DateTime<Utc>, id: Uuid, after: Option<&RecencyKey>) -> bool {
    after.map_or(true, |k| (timestamp, id) < (k.timestamp, k.id))
}

// =============================================================================
// InMemoryRepositories
// =============================================================================

/// All repositories and the identity provider over shared in-memory state.
#[derive(Default)]
pub struct InMemoryRepositories {
    state: RwLock<State>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user.
    pub async fn create_user(&self, username: &str, is_moderator: bool) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: None,
            is_moderator,
        };
        self.state
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Issue a bearer token for `user_id`, valid for `ttl`.
    pub async fn create_session(&self, user_id: Uuid, ttl: Duration) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut state = self.state.write().await;
        let expire_at = state.now()
            + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(1));
        state.sessions.insert(token.clone(), (user_id, expire_at));
        token
    }

    /// Drop sessions whose expiry has passed, returning how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> u64 {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let before = state.sessions.len();
        state.sessions.retain(|_, (_, expire_at)| *expire_at >= now);
        (before - state.sessions.len()) as u64
    }
}

impl Repositories for InMemoryRepositories {
    fn studysets(&self) -> &dyn StudysetRepository {
        self
    }

    fn terms(&self) -> &dyn TermRepository {
        self
    }

    fn folders(&self) -> &dyn FolderRepository {
        self
    }

    fn progress(&self) -> &dyn ProgressRepository {
        self
    }

    fn practice_tests(&self) -> &dyn PracticeTestRepository {
        self
    }

    fn saved(&self) -> &dyn SavedStudysetRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }
}

#[async_trait]
impl IdentityProvider for InMemoryRepositories {
    async fn resolve(&self, bearer: Option<&str>) -> StorageResult<Identity> {
        let Some(token) = bearer else {
            return Ok(Identity::Anonymous);
        };
        let state = self.state.read().await;
        let Some((user_id, expire_at)) = state.sessions.get(token) else {
            return Ok(Identity::Anonymous);
        };
        if *expire_at <= Utc::now() {
            return Ok(Identity::Anonymous);
        }
        Ok(match state.users.get(user_id) {
            Some(user) => Identity::Authenticated {
                user_id: user.id,
                is_moderator: user.is_moderator,
            },
            None => Identity::Anonymous,
        })
    }
}

// =============================================================================
// Studysets
// =============================================================================

#[async_trait]
impl StudysetRepository for InMemoryRepositories {
    async fn get_studyset(&self, id: Uuid) -> StorageResult<Option<Studyset>> {
        Ok(self.state.read().await.studysets.get(&id).cloned())
    }

    async fn list_studysets_by_user(
        &self,
        user_id: Uuid,
        include_private: bool,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>> {
        let state = self.state.read().await;
        let mut rows: Vec<Studyset> = state
            .studysets
            .values()
            .filter(|s| s.user_id == user_id && (include_private || !s.private))
            .filter(|s| recency_after(s.updated_at, s.id, after))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn list_recent_studysets(
        &self,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<Studyset>> {
        let state = self.state.read().await;
        let mut rows: Vec<Studyset> = state
            .studysets
            .values()
            .filter(|s| !s.private && recency_after(s.updated_at, s.id, after))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn search_studysets(
        &self,
        query: &str,
        subject_id: Option<&str>,
        after: Option<&RankedKey>,
        limit: usize,
    ) -> StorageResult<Vec<RankedStudyset>> {
        let state = self.state.read().await;
        let mut hits: Vec<RankedStudyset> = state
            .studysets
            .values()
            .filter(|s| !s.private)
            .filter(|s| subject_id.map_or(true, |subject| s.subject_id.as_deref() == Some(subject)))
            .filter_map(|s| rank(query, s))
            .filter(|hit| ranked_after(hit, after))
            .collect();
        hits.sort_by(ranked_desc);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn insert_studyset(
        &self,
        owner: Uuid,
        input: &StudysetInput,
    ) -> StorageResult<Studyset> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&owner) {
            return Err(StorageError::ConstraintViolation(format!(
                "studyset owner {owner} does not exist"
            )));
        }
        let now = state.now();
        let studyset = Studyset {
            id: Uuid::new_v4(),
            user_id: owner,
            title: input.title.clone(),
            private: input.private,
            subject_id: input.subject_id.clone(),
            created_at: now,
            updated_at: now,
        };
        state.studysets.insert(studyset.id, studyset.clone());
        Ok(studyset)
    }

    async fn update_studyset(
        &self,
        id: Uuid,
        input: &StudysetInput,
    ) -> StorageResult<Option<Studyset>> {
        let mut state = self.state.write().await;
        let now = state.now();
        let Some(studyset) = state.studysets.get_mut(&id) else {
            return Ok(None);
        };
        studyset.title = input.title.clone();
        studyset.private = input.private;
        studyset.subject_id = input.subject_id.clone();
        studyset.updated_at = now;
        Ok(Some(studyset.clone()))
    }

    async fn delete_studyset(&self, id: Uuid) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        if state.studysets.remove(&id).is_none() {
            return Ok(false);
        }
        let term_ids: Vec<Uuid> = state
            .terms
            .values()
            .filter(|t| t.studyset_id == id)
            .map(|t| t.id)
            .collect();
        state.remove_terms(&term_ids);
        state.memberships.retain(|(_, studyset_id), _| *studyset_id != id);
        state.saved.retain(|(_, studyset_id), _| *studyset_id != id);
        state.practice_tests.retain(|_, t| t.studyset_id != id);
        Ok(true)
    }
}

// =============================================================================
// Terms
// =============================================================================

#[async_trait]
impl TermRepository for InMemoryRepositories {
    async fn get_term(&self, id: Uuid) -> StorageResult<Option<Term>> {
        Ok(self.state.read().await.terms.get(&id).cloned())
    }

    async fn list_terms(&self, studyset_id: Uuid) -> StorageResult<Vec<Term>> {
        let state = self.state.read().await;
        let mut terms: Vec<Term> = state
            .terms
            .values()
            .filter(|t| t.studyset_id == studyset_id)
            .cloned()
            .collect();
        terms.sort_by_key(|t| (t.sort_order, t.id));
        Ok(terms)
    }

    async fn count_terms(&self, studyset_id: Uuid) -> StorageResult<i64> {
        let state = self.state.read().await;
        let count = state
            .terms
            .values()
            .filter(|t| t.studyset_id == studyset_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_terms(
        &self,
        studyset_id: Uuid,
        terms: &[NewTerm],
    ) -> StorageResult<Vec<Term>> {
        let mut state = self.state.write().await;
        if !state.studysets.contains_key(&studyset_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "studyset {studyset_id} does not exist"
            )));
        }
        let mut created = Vec::with_capacity(terms.len());
        for new in terms {
            let now = state.now();
            let term = Term {
                id: Uuid::new_v4(),
                studyset_id,
                term: new.term.clone(),
                def: new.def.clone(),
                sort_order: new.sort_order,
                created_at: now,
                updated_at: now,
            };
            state.terms.insert(term.id, term.clone());
            created.push(term);
        }
        state.touch_studyset(studyset_id);
        Ok(created)
    }

    async fn update_terms(
        &self,
        studyset_id: Uuid,
        updates: &[TermUpdate],
    ) -> StorageResult<Vec<Term>> {
        let mut state = self.state.write().await;
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let now = state.now();
            let Some(term) = state
                .terms
                .get_mut(&update.id)
                .filter(|t| t.studyset_id == studyset_id)
            else {
                continue;
            };
            if let Some(text) = &update.term {
                term.term = text.clone();
            }
            if let Some(def) = &update.def {
                term.def = def.clone();
            }
            if let Some(sort_order) = update.sort_order {
                term.sort_order = sort_order;
            }
            term.updated_at = now;
            updated.push(term.clone());
        }
        state.touch_studyset(studyset_id);
        Ok(updated)
    }

    async fn delete_terms(&self, studyset_id: Uuid, ids: &[Uuid]) -> StorageResult<Vec<Uuid>> {
        let mut state = self.state.write().await;
        let deleted: Vec<Uuid> = ids
            .iter()
            .copied()
            .filter(|id| {
                state
                    .terms
                    .get(id)
                    .is_some_and(|t| t.studyset_id == studyset_id)
            })
            .collect();
        state.remove_terms(&deleted);
        state.touch_studyset(studyset_id);
        Ok(deleted)
    }
}

// =============================================================================
// Folders
// =============================================================================

#[async_trait]
impl FolderRepository for InMemoryRepositories {
    async fn get_folder(&self, id: Uuid) -> StorageResult<Option<Folder>> {
        Ok(self.state.read().await.folders.get(&id).cloned())
    }

    async fn list_folders_by_user(
        &self,
        user_id: Uuid,
        after: Option<&IdKey>,
        limit: usize,
    ) -> StorageResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.user_id == user_id && after.map_or(true, |k| f.id > k.id))
            .cloned()
            .collect();
        folders.sort_by_key(|f| f.id);
        folders.truncate(limit);
        Ok(folders)
    }

    async fn insert_folder(&self, user_id: Uuid, name: &str) -> StorageResult<Folder> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "folder owner {user_id} does not exist"
            )));
        }
        let folder = Folder {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        state.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn rename_folder(&self, id: Uuid, name: &str) -> StorageResult<Option<Folder>> {
        let mut state = self.state.write().await;
        Ok(state.folders.get_mut(&id).map(|folder| {
            folder.name = name.to_string();
            folder.clone()
        }))
    }

    async fn delete_folder(&self, id: Uuid) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        if state.folders.remove(&id).is_none() {
            return Ok(false);
        }
        state.memberships.retain(|_, folder_id| *folder_id != id);
        Ok(true)
    }

    async fn set_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
        folder_id: Uuid,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if !state.studysets.contains_key(&studyset_id) || !state.folders.contains_key(&folder_id) {
            return Err(StorageError::ConstraintViolation(
                "folder membership references a missing row".to_string(),
            ));
        }
        state.memberships.insert((user_id, studyset_id), folder_id);
        Ok(())
    }

    async fn remove_studyset_from_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.memberships.remove(&(user_id, studyset_id)).is_some())
    }

    async fn get_studyset_folder(
        &self,
        user_id: Uuid,
        studyset_id: Uuid,
    ) -> StorageResult<Option<Folder>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .get(&(user_id, studyset_id))
            .and_then(|folder_id| state.folders.get(folder_id))
            .cloned())
    }

    async fn list_folder_studysets(&self, folder_id: Uuid) -> StorageResult<Vec<Studyset>> {
        let state = self.state.read().await;
        let mut studysets: Vec<Studyset> = state
            .memberships
            .iter()
            .filter(|(_, f)| **f == folder_id)
            .filter_map(|((_, studyset_id), _)| state.studysets.get(studyset_id))
            .cloned()
            .collect();
        studysets.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        Ok(studysets)
    }
}

// =============================================================================
// Learning records
// =============================================================================

#[async_trait]
impl ProgressRepository for InMemoryRepositories {
    async fn get_term_progress(
        &self,
        user_id: Uuid,
        term_id: Uuid,
    ) -> StorageResult<Option<TermProgress>> {
        Ok(self
            .state
            .read()
            .await
            .progress
            .get(&(user_id, term_id))
            .cloned())
    }

    async fn apply_term_progress(
        &self,
        user_id: Uuid,
        updates: &[TermProgressUpdate],
    ) -> StorageResult<Vec<TermProgress>> {
        let mut state = self.state.write().await;
        if let Some(missing) = updates.iter().find(|u| !state.terms.contains_key(&u.term_id)) {
            return Err(StorageError::ConstraintViolation(format!(
                "term {} does not exist",
                missing.term_id
            )));
        }

        // Staged first so an overflowing row leaves the whole batch unapplied.
        let mut staged: HashMap<Uuid, TermProgress> = HashMap::new();
        let mut applied = Vec::with_capacity(updates.len());
        for update in updates {
            let now = state.now();
            let current = match staged.get(&update.term_id) {
                Some(progress) => progress.clone(),
                None => state
                    .progress
                    .get(&(user_id, update.term_id))
                    .cloned()
                    .unwrap_or_else(|| TermProgress {
                        id: Uuid::new_v4(),
                        term_id: update.term_id,
                        user_id,
                        timestamp: now,
                        term_correct_count: 0,
                        term_incorrect_count: 0,
                        def_correct_count: 0,
                        def_incorrect_count: 0,
                        term_leitner_system_box: None,
                        def_leitner_system_box: None,
                    }),
            };
            let progress = accumulate(current, update, now)?;
            applied.push(progress.clone());
            staged.insert(update.term_id, progress);
        }

        for (term_id, progress) in staged {
            state.progress.insert((user_id, term_id), progress);
        }
        Ok(applied)
    }
}

#[async_trait]
impl PracticeTestRepository for InMemoryRepositories {
    async fn get_practice_test(&self, id: Uuid) -> StorageResult<Option<PracticeTest>> {
        Ok(self.state.read().await.practice_tests.get(&id).cloned())
    }

    async fn list_practice_tests(
        &self,
        user_id: Uuid,
        studyset_id: Option<Uuid>,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<PracticeTest>> {
        let state = self.state.read().await;
        let mut tests: Vec<PracticeTest> = state
            .practice_tests
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| studyset_id.map_or(true, |id| t.studyset_id == id))
            .filter(|t| recency_after(t.timestamp, t.id, after))
            .cloned()
            .collect();
        tests.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        tests.truncate(limit);
        Ok(tests)
    }

    async fn insert_practice_test(
        &self,
        user_id: Uuid,
        test: &NewPracticeTest,
    ) -> StorageResult<PracticeTest> {
        let mut state = self.state.write().await;
        if !state.studysets.contains_key(&test.studyset_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "studyset {} does not exist",
                test.studyset_id
            )));
        }
        let recorded = PracticeTest {
            id: Uuid::new_v4(),
            studyset_id: test.studyset_id,
            user_id,
            timestamp: state.now(),
            questions_correct: test.questions_correct,
            questions_total: test.questions_total,
            questions: test.questions.clone(),
        };
        state.practice_tests.insert(recorded.id, recorded.clone());
        Ok(recorded)
    }

    async fn update_practice_test(
        &self,
        update: &PracticeTestUpdate,
    ) -> StorageResult<Option<PracticeTest>> {
        let mut state = self.state.write().await;
        Ok(state.practice_tests.get_mut(&update.id).map(|test| {
            test.questions_correct = update.questions_correct;
            test.questions_total = update.questions_total;
            test.questions = update.questions.clone();
            test.clone()
        }))
    }
}

// =============================================================================
// Saved studysets and users
// =============================================================================

#[async_trait]
impl SavedStudysetRepository for InMemoryRepositories {
    async fn save_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if !state.studysets.contains_key(&studyset_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "studyset {studyset_id} does not exist"
            )));
        }
        let now = state.now();
        state.saved.entry((user_id, studyset_id)).or_insert(now);
        Ok(())
    }

    async fn unsave_studyset(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.saved.remove(&(user_id, studyset_id)).is_some())
    }

    async fn is_saved(&self, user_id: Uuid, studyset_id: Uuid) -> StorageResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .saved
            .contains_key(&(user_id, studyset_id)))
    }

    async fn list_saved_studysets(
        &self,
        user_id: Uuid,
        after: Option<&RecencyKey>,
        limit: usize,
    ) -> StorageResult<Vec<SavedStudyset>> {
        let state = self.state.read().await;
        let mut rows: Vec<SavedStudyset> = state
            .saved
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .filter(|((_, studyset_id), saved_at)| recency_after(**saved_at, *studyset_id, after))
            .filter_map(|((_, studyset_id), saved_at)| {
                state.studysets.get(studyset_id).map(|studyset| SavedStudyset {
                    user_id,
                    studyset: studyset.clone(),
                    saved_at: *saved_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| (b.saved_at, b.studyset.id).cmp(&(a.saved_at, a.studyset.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepositories {
    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}
