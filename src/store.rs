use crate::domain::models::{
    Category, LogEntry, LogType, Question, Submission, SyncState, User, UserRole, UserStatus,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// View-model state of one signed-in browser: the session user and the
/// caches rebuilt from the webhook service.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub current_user: Option<User>,
    pub users: Vec<User>,
    pub categories: Vec<Category>,
    pub questions: Vec<Question>,
    pub submissions: Vec<Submission>,
    pub logs: Vec<LogEntry>,
    /// Expiry of the newest cookie issued for this session.
    pub expires_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Store {
    pub fn for_user(user: User) -> Self {
        let mut store = Self::default();
        store.sign_in(user);
        store
    }

    /// Company users are also upserted into `users` so the dashboard finds them.
    pub fn sign_in(&mut self, user: User) {
        if user.role == UserRole::Company {
            self.users.retain(|u| u.id != user.id);
            self.users.push(user.clone());
        }
        self.current_user = Some(user);
    }

    pub fn touch(&mut self, now: DateTime<Utc>, expires_at: DateTime<Utc>) {
        self.last_seen = Some(now);
        self.expires_at = Some(self.expires_at.map_or(expires_at, |at| at.max(expires_at)));
    }

    /// A session is stale once its cookie expired or it sat idle past `idle`.
    pub fn is_stale(&self, now: DateTime<Utc>, idle: Duration) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
            || self.last_seen.is_some_and(|seen| now - seen > idle)
    }

    pub fn sign_out(&mut self) {
        self.current_user = None;
    }

    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().is_some_and(User::is_admin)
    }

    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }

    pub fn set_user_status(&mut self, user_id: &str, status: UserStatus) -> bool {
        match self.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        }
    }

    pub fn pending_users(&self) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| u.status == UserStatus::Pending)
            .collect()
    }

    /// Pending users are replaced by the remote list. A password captured at
    /// registration survives when the e-mail matches.
    pub fn merge_pending_users(&mut self, remote: Vec<User>) {
        let (local_pending, mut kept): (Vec<User>, Vec<User>) = std::mem::take(&mut self.users)
            .into_iter()
            .partition(|u| u.status == UserStatus::Pending);

        let merged = remote.into_iter().map(|mut user| {
            if let Some(local) = local_pending
                .iter()
                .find(|l| l.email == user.email && l.password_hash.is_some())
            {
                user.password_hash = local.password_hash.clone();
            }
            user
        });
        kept.extend(merged);
        self.users = kept;
    }

    /// Approved company users come from the score sheet; admins and
    /// non-approved users stay.
    pub fn replace_company_users(&mut self, companies: Vec<User>) {
        self.drop_company_users();
        self.users.extend(companies);
    }

    pub fn drop_company_users(&mut self) {
        self.users
            .retain(|u| u.status != UserStatus::Approved || u.role == UserRole::Admin);
    }

    pub fn approved_companies(&self) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| u.role == UserRole::Company && u.status == UserStatus::Approved)
            .collect()
    }

    pub fn replace_catalog(&mut self, categories: Vec<Category>, questions: Vec<Question>) {
        self.categories = categories;
        self.questions = questions;
    }

    pub fn has_catalog(&self) -> bool {
        !self.categories.is_empty() && !self.questions.is_empty()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn add_category(&mut self, category: Category) {
        self.categories.push(category);
    }

    pub fn rename_category(&mut self, id: &str, name: &str) {
        if let Some(category) = self.categories.iter_mut().find(|c| c.id == id) {
            category.name = name.to_string();
        }
    }

    /// Questions of a removed category stay in place.
    pub fn remove_category(&mut self, id: &str) {
        self.categories.retain(|c| c.id != id);
    }

    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    pub fn replace_question(&mut self, question: Question) {
        if let Some(slot) = self.questions.iter_mut().find(|q| q.id == question.id) {
            *slot = question;
        }
    }

    pub fn remove_question(&mut self, id: &str) {
        self.questions.retain(|q| q.id != id);
    }

    /// The score sheet replaces confirmed entries. Pending and failed local
    /// entries stay until the sheet carries the same user and category.
    pub fn replace_submissions(&mut self, submissions: Vec<Submission>) {
        let unsettled: Vec<Submission> = std::mem::take(&mut self.submissions)
            .into_iter()
            .filter(|local| local.sync != SyncState::Confirmed)
            .filter(|local| {
                !submissions
                    .iter()
                    .any(|s| s.user_id == local.user_id && s.category_id == local.category_id)
            })
            .collect();
        self.submissions = submissions;
        self.submissions.extend(unsettled);
    }

    pub fn insert_submission(&mut self, submission: Submission) {
        self.submissions.push(submission);
    }

    /// Records the webhook verdict on an optimistic submission. The entry is
    /// kept either way.
    pub fn settle_submission(&mut self, id: &str, sync: SyncState) {
        if let Some(submission) = self.submissions.iter_mut().find(|s| s.id == id) {
            submission.sync = sync;
        }
    }

    pub fn submissions_of(&self, user_id: &str) -> Vec<&Submission> {
        self.submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .collect()
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.insert(0, entry);
    }

    /// Fresh entries of `kind` go first; entries of other kinds are kept.
    pub fn replace_logs(&mut self, kind: LogType, fresh: Vec<LogEntry>) {
        let others = std::mem::take(&mut self.logs)
            .into_iter()
            .filter(|l| l.kind != kind);
        self.logs = fresh.into_iter().chain(others).collect();
    }
}

/// All live session stores, keyed by the id carried in the session cookie,
/// plus registrations waiting for an administrator.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Store>>>,
    registrations: Arc<RwLock<Vec<User>>>,
}

impl SessionStore {
    pub async fn hold_registration(&self, user: User) {
        let mut held = self.registrations.write().await;
        held.retain(|u| u.email != user.email);
        held.push(user);
    }

    pub async fn registrations(&self) -> Vec<User> {
        self.registrations.read().await.clone()
    }

    pub async fn release_registration(&self, email: &str) {
        self.registrations.write().await.retain(|u| u.email != email);
    }

    /// Drops held registrations the remote pending list no longer carries.
    pub async fn retain_registrations(&self, pending_emails: &[String]) -> usize {
        let mut held = self.registrations.write().await;
        let before = held.len();
        held.retain(|u| pending_emails.contains(&u.email));
        before - held.len()
    }

    /// Creates the store from the cookie's user when the session is unknown,
    /// e.g. after a restart or a prune, and marks it as seen.
    pub async fn ensure(&self, session_id: Uuid, user: &User, expires_at: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| Store::for_user(user.clone()))
            .touch(Utc::now(), expires_at);
    }

    pub async fn insert(&self, session_id: Uuid, store: Store) {
        self.sessions.write().await.insert(session_id, store);
    }

    pub async fn remove(&self, session_id: Uuid) -> Option<Store> {
        self.sessions.write().await.remove(&session_id)
    }

    /// Runs `f` under the read lock.
    pub async fn read<R>(&self, session_id: Uuid, f: impl FnOnce(&Store) -> R) -> Option<R> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map(f)
    }

    pub async fn update<R>(&self, session_id: Uuid, f: impl FnOnce(&mut Store) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&session_id).map(f)
    }

    pub async fn admin_sessions(&self) -> Vec<Uuid> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(_, store)| store.is_admin())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Removes expired and idle sessions, returning how many went.
    pub async fn prune(&self, now: DateTime<Utc>, idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, store| !store.is_stale(now, idle));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
