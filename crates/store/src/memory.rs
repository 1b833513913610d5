//! In-memory store backed by `tokio::sync::RwLock` maps.
//!
//! Each check-then-write happens under a single write guard, so version
//! checks and the one-open-session rule hold under concurrent callers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use domain::{Group, GroupId, SessionId, User, UserId, VotingSession};

use crate::error::{Result, StoreError};
use crate::traits::{GroupStore, SessionStore, UserStore};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    groups: Arc<RwLock<HashMap<GroupId, Group>>>,
    sessions: Arc<RwLock<HashMap<SessionId, VotingSession>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn check_version(entity: &'static str, id: String, stored: u64, incoming: u64) -> Result<()> {
    if stored == incoming {
        Ok(())
    } else {
        debug!(entity, id = %id, stored, incoming, "version conflict");
        Err(StoreError::VersionConflict {
            entity,
            id,
            expected: incoming,
            found: stored,
        })
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate {
                entity: "user",
                id: user.id,
            });
        }
        user.version = 0;
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn replace_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        let stored = users.get(&user.id).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user.id.clone(),
        })?;
        check_version("user", user.id.clone(), stored.version, user.version)?;

        user.version += 1;
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn insert_group(&self, mut group: Group) -> Result<Group> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(&group.id) {
            return Err(StoreError::Duplicate {
                entity: "group",
                id: group.id.to_string(),
            });
        }
        if code_in_use(&groups, &group.invitation_code, group.id) {
            return Err(StoreError::DuplicateInvitationCode(group.invitation_code));
        }
        group.version = 0;
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn find_by_invitation_code(&self, code: &str) -> Result<Option<Group>> {
        let groups = self.groups.read().await;
        Ok(groups
            .values()
            .find(|g| g.is_active && g.invitation_code == code)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(groups
            .values()
            .filter(|g| g.is_active && g.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn count_active_for_user(&self, user_id: &UserId) -> Result<usize> {
        let groups = self.groups.read().await;
        Ok(groups
            .values()
            .filter(|g| g.is_active && g.is_member(user_id))
            .count())
    }

    async fn replace_group(&self, mut group: Group) -> Result<Group> {
        let mut groups = self.groups.write().await;
        let stored = groups.get(&group.id).ok_or_else(|| StoreError::NotFound {
            entity: "group",
            id: group.id.to_string(),
        })?;
        check_version("group", group.id.to_string(), stored.version, group.version)?;
        if group.is_active && code_in_use(&groups, &group.invitation_code, group.id) {
            return Err(StoreError::DuplicateInvitationCode(group.invitation_code));
        }

        group.version += 1;
        groups.insert(group.id, group.clone());
        Ok(group)
    }
}

fn code_in_use(groups: &HashMap<GroupId, Group>, code: &str, except: GroupId) -> bool {
    groups
        .values()
        .any(|g| g.id != except && g.is_active && g.invitation_code == code)
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, mut session: VotingSession) -> Result<VotingSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate {
                entity: "session",
                id: session.id.to_string(),
            });
        }
        if session.status.is_open() && has_other_open(&sessions, session.group_id, session.id) {
            return Err(StoreError::OpenSessionExists(session.group_id));
        }
        session.version = 0;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<VotingSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn find_open_for_group(&self, group_id: GroupId) -> Result<Option<VotingSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| s.group_id == group_id && s.status.is_open())
            .cloned())
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<VotingSession>> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<VotingSession> = sessions
            .values()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn list_open(&self) -> Result<Vec<VotingSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().filter(|s| s.status.is_open()).cloned().collect())
    }

    async fn replace_session(&self, mut session: VotingSession) -> Result<VotingSession> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get(&session.id).ok_or_else(|| StoreError::NotFound {
            entity: "session",
            id: session.id.to_string(),
        })?;
        check_version("session", session.id.to_string(), stored.version, session.version)?;
        if session.status.is_open() && has_other_open(&sessions, session.group_id, session.id) {
            return Err(StoreError::OpenSessionExists(session.group_id));
        }

        session.version += 1;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }
}

fn has_other_open(
    sessions: &HashMap<SessionId, VotingSession>,
    group_id: GroupId,
    except: SessionId,
) -> bool {
    sessions
        .values()
        .any(|s| s.id != except && s.group_id == group_id && s.status.is_open())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use domain::SessionSettings;

    fn group(owner: &str) -> Group {
        Group::new("Film Club", None, owner, Utc::now()).unwrap()
    }

    fn session(group_id: GroupId) -> VotingSession {
        VotingSession::new(group_id, "owner", Vec::new(), SessionSettings::default(), Utc::now())
    }

    #[tokio::test]
    async fn test_replace_bumps_version() {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(User::new("u1", "u1@example.com", "U1", Utc::now()))
            .await
            .unwrap();
        assert_eq!(user.version, 0);

        let updated = store.replace_user(user.clone()).await.unwrap();
        assert_eq!(updated.version, 1);

        // The stale copy is rejected
        assert_matches!(
            store.replace_user(user).await,
            Err(StoreError::VersionConflict { expected: 0, found: 1, .. })
        );
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_user(User::new("u1", "a@example.com", "A", Utc::now()))
            .await
            .unwrap();
        assert_matches!(
            store
                .insert_user(User::new("u1", "b@example.com", "B", Utc::now()))
                .await,
            Err(StoreError::Duplicate { entity: "user", .. })
        );
    }

    #[tokio::test]
    async fn test_invitation_code_unique_among_active_groups() {
        let store = InMemoryStore::new();
        let first = store.insert_group(group("alice")).await.unwrap();

        let mut clash = group("bob");
        clash.invitation_code = first.invitation_code.clone();
        assert_matches!(
            store.insert_group(clash.clone()).await,
            Err(StoreError::DuplicateInvitationCode(_))
        );

        // Deactivated groups release their code
        let mut first = first;
        first.deactivate(Utc::now()).unwrap();
        store.replace_group(first).await.unwrap();
        store.insert_group(clash).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_by_code_skips_inactive() {
        let store = InMemoryStore::new();
        let mut g = store.insert_group(group("alice")).await.unwrap();
        let code = g.invitation_code.clone();
        assert!(store.find_by_invitation_code(&code).await.unwrap().is_some());

        g.deactivate(Utc::now()).unwrap();
        store.replace_group(g).await.unwrap();
        assert!(store.find_by_invitation_code(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_open_session_per_group() {
        let store = InMemoryStore::new();
        let group_id = GroupId::new_v4();

        let first = store.insert_session(session(group_id)).await.unwrap();
        assert_matches!(
            store.insert_session(session(group_id)).await,
            Err(StoreError::OpenSessionExists(id)) if id == group_id
        );

        // Another group is unaffected
        store.insert_session(session(GroupId::new_v4())).await.unwrap();

        let mut first = first;
        first.start("owner", Utc::now()).unwrap();
        first.cancel("owner", Utc::now()).unwrap();
        store.replace_session(first).await.unwrap();

        store.insert_session(session(group_id)).await.unwrap();
        assert_eq!(store.list_for_group(group_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_open_excludes_terminal() {
        let store = InMemoryStore::new();
        let mut s = store.insert_session(session(GroupId::new_v4())).await.unwrap();
        assert_eq!(store.list_open().await.unwrap().len(), 1);

        s.start("owner", Utc::now()).unwrap();
        s.complete("owner", Utc::now()).unwrap();
        store.replace_session(s).await.unwrap();
        assert!(store.list_open().await.unwrap().is_empty());
    }
}
