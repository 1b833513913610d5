//! Group membership, invitation codes and soft deletion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use domain::{DomainError, Group, GroupId, Member, UserId, normalize_invitation_code};
use fanout::{Dispatcher, EventKind};
use store::{Store, StoreError};

use super::users::UserService;
use super::{MAX_UPDATE_ATTEMPTS, committed, contention, storage_failure};

/// Attempts at finding an unused invitation code.
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub group_id: GroupId,
    pub member_count: usize,
    pub members_with_preferences: usize,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn Store>,
    users: UserService,
    notifications: Dispatcher,
    max_groups_per_user: usize,
}

impl GroupService {
    pub fn new(store: Arc<dyn Store>, notifications: Dispatcher, max_groups_per_user: usize) -> Self {
        Self {
            users: UserService::new(store.clone()),
            store,
            notifications,
            max_groups_per_user,
        }
    }

    /// Create a group owned by `owner_id`, who becomes its first member.
    #[instrument(skip(self, description))]
    pub async fn create_group(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> domain::Result<Group> {
        let owner = self.users.get_active_user(owner_id).await?;
        self.ensure_below_limit(&owner.id).await?;

        let mut group = Group::new(name, description, owner.id.clone(), Utc::now())?;
        if !owner.preferences.is_empty() {
            group.set_member_preferences(&owner.id, owner.preferences.clone(), Utc::now())?;
        }

        for _ in 0..CODE_ATTEMPTS {
            match self.store.insert_group(group.clone()).await {
                Ok(saved) => {
                    info!(group_id = %saved.id, "group created");
                    return Ok(saved);
                }
                Err(StoreError::DuplicateInvitationCode(code)) => {
                    warn!(code, "invitation code collision, regenerating");
                    group.regenerate_invitation_code(Utc::now());
                }
                Err(e) => return Err(storage_failure(e)),
            }
        }
        Err(DomainError::Internal("could not allocate an invitation code".to_string()))
    }

    /// Join the active group holding `code`. Member preferences start from
    /// the user's global preferences.
    #[instrument(skip(self, code))]
    pub async fn join_group(&self, code: &str, user_id: &str) -> domain::Result<Group> {
        let user = self.users.get_active_user(user_id).await?;
        let code = normalize_invitation_code(code);
        let found = self
            .store
            .find_by_invitation_code(&code)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| DomainError::InvalidInvitationCode(code.clone()))?;
        if found.is_member(user_id) {
            return Err(DomainError::AlreadyMember {
                user_id: user_id.to_string(),
                group_id: found.id,
            });
        }
        self.ensure_below_limit(&user.id).await?;

        let saved = self
            .update(found.id, |group| {
                let member = Member::new(user.id.clone(), Utc::now()).with_preferences(user.preferences.clone());
                group.add_member(member, Utc::now())
            })
            .await?;

        info!(group_id = %saved.id, user_id, "member joined");
        self.notifications
            .group(
                saved.id,
                EventKind::MemberJoined,
                json!({ "groupId": saved.id, "userId": user_id, "displayName": user.display_name }),
            )
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn leave_group(&self, group_id: GroupId, user_id: &str) -> domain::Result<Group> {
        let saved = self
            .update(group_id, |group| group.remove_member(user_id, Utc::now()))
            .await?;

        info!(%group_id, user_id, "member left");
        self.notifications
            .group(group_id, EventKind::MemberLeft, json!({ "groupId": group_id, "userId": user_id }))
            .await;
        Ok(saved)
    }

    /// Soft delete. Only the owner may delete; voting history stays readable.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, group_id: GroupId, caller: &str) -> domain::Result<Group> {
        let saved = self
            .update(group_id, |group| {
                group.ensure_owner(caller, "delete the group")?;
                group.deactivate(Utc::now())
            })
            .await?;

        info!(%group_id, "group deleted");
        self.notifications
            .group(group_id, EventKind::GroupDeleted, json!({ "groupId": group_id }))
            .await;
        Ok(saved)
    }

    /// A group as seen by one of its members.
    pub async fn get_group(&self, group_id: GroupId, caller: &str) -> domain::Result<Group> {
        let group = self.load(group_id).await?;
        group.ensure_active()?;
        group.ensure_member(caller)?;
        Ok(group)
    }

    /// Active groups of a user, most recently updated first.
    pub async fn list_user_groups(&self, user_id: &str) -> domain::Result<Vec<Group>> {
        let mut groups = self
            .store
            .list_for_user(&user_id.to_string())
            .await
            .map_err(storage_failure)?;
        groups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    pub async fn get_invitation_code(&self, group_id: GroupId, caller: &str) -> domain::Result<String> {
        Ok(self.get_group(group_id, caller).await?.invitation_code)
    }

    /// Issue a new invitation code; the old one stops working.
    #[instrument(skip(self))]
    pub async fn regenerate_invitation_code(&self, group_id: GroupId, caller: &str) -> domain::Result<String> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut group = self.load(group_id).await?;
            group.ensure_active()?;
            group.ensure_owner(caller, "regenerate the invitation code")?;
            group.regenerate_invitation_code(Utc::now());

            match self.store.replace_group(group).await {
                Ok(saved) => {
                    info!(%group_id, "invitation code regenerated");
                    return Ok(saved.invitation_code);
                }
                Err(StoreError::DuplicateInvitationCode(_)) => continue,
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(storage_failure(e)),
            }
        }
        Err(contention("group", group_id))
    }

    pub async fn group_stats(&self, group_id: GroupId, caller: &str) -> domain::Result<GroupStats> {
        let group = self.get_group(group_id, caller).await?;
        Ok(GroupStats {
            group_id: group.id,
            member_count: group.member_count(),
            members_with_preferences: group.members.iter().filter(|m| m.has_preferences()).count(),
            is_owner: group.is_owner(caller),
            created_at: group.created_at,
            updated_at: group.updated_at,
        })
    }

    async fn ensure_below_limit(&self, user_id: &UserId) -> domain::Result<()> {
        let count = self
            .store
            .count_active_for_user(user_id)
            .await
            .map_err(storage_failure)?;
        if count >= self.max_groups_per_user {
            return Err(DomainError::GroupLimitReached {
                user_id: user_id.clone(),
                limit: self.max_groups_per_user,
            });
        }
        Ok(())
    }

    async fn load(&self, group_id: GroupId) -> domain::Result<Group> {
        self.store
            .get_group(group_id)
            .await
            .map_err(storage_failure)?
            .ok_or(DomainError::GroupNotFound(group_id))
    }

    pub(crate) async fn update<F>(&self, group_id: GroupId, mut apply: F) -> domain::Result<Group>
    where
        F: FnMut(&mut Group) -> domain::Result<()>,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut group = self.load(group_id).await?;
            apply(&mut group)?;
            if let Some(saved) = committed(self.store.replace_group(group).await)? {
                return Ok(saved);
            }
        }
        Err(contention("group", group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use domain::GenrePreference;
    use fanout::LogNotifier;
    use store::InMemoryStore;

    async fn setup(limit: usize) -> (GroupService, UserService) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let users = UserService::new(store.clone());
        for id in ["owner", "ann", "bob"] {
            users
                .ensure_user(id, &format!("{}@example.com", id), id)
                .await
                .unwrap();
        }
        let groups = GroupService::new(store, Dispatcher::new(Arc::new(LogNotifier)), limit);
        (groups, users)
    }

    #[tokio::test]
    async fn test_create_and_join_by_code() {
        let (groups, users) = setup(10).await;
        users
            .set_user_preferences("ann", vec![GenrePreference::new(35, "Comedy", 7)])
            .await
            .unwrap();

        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.invitation_code.len(), 8);

        let joined = groups
            .join_group(&group.invitation_code.to_lowercase(), "ann")
            .await
            .unwrap();
        assert_eq!(joined.members.len(), 2);
        // Seeded from global preferences
        assert_eq!(joined.member("ann").unwrap().preferences.len(), 1);

        assert_matches!(
            groups.join_group(&group.invitation_code, "ann").await,
            Err(DomainError::AlreadyMember { .. })
        );
        assert_matches!(
            groups.join_group("NOPE1234", "bob").await,
            Err(DomainError::InvalidInvitationCode(_))
        );
    }

    #[tokio::test]
    async fn test_owner_cannot_leave_but_can_delete() {
        let (groups, _) = setup(10).await;
        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        groups.join_group(&group.invitation_code, "ann").await.unwrap();

        assert_matches!(
            groups.leave_group(group.id, "owner").await,
            Err(DomainError::OwnerCannotLeave)
        );
        assert_matches!(
            groups.delete_group(group.id, "ann").await,
            Err(DomainError::NotOwner { .. })
        );

        groups.leave_group(group.id, "ann").await.unwrap();
        groups.delete_group(group.id, "owner").await.unwrap();

        assert_matches!(
            groups.get_group(group.id, "owner").await,
            Err(DomainError::GroupInactive(_))
        );
        assert_matches!(
            groups.join_group(&group.invitation_code, "bob").await,
            Err(DomainError::InvalidInvitationCode(_))
        );
        assert!(groups.list_user_groups("owner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_group_requires_membership() {
        let (groups, _) = setup(10).await;
        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        assert_matches!(
            groups.get_group(group.id, "bob").await,
            Err(DomainError::NotAMember { .. })
        );
        assert_matches!(
            groups.get_invitation_code(group.id, "bob").await,
            Err(DomainError::NotAMember { .. })
        );
    }

    #[tokio::test]
    async fn test_group_limit() {
        let (groups, _) = setup(2).await;
        groups.create_group("owner", "One", None).await.unwrap();
        groups.create_group("owner", "Two", None).await.unwrap();
        assert_matches!(
            groups.create_group("owner", "Three", None).await,
            Err(DomainError::GroupLimitReached { limit: 2, .. })
        );
    }

    #[tokio::test]
    async fn test_regenerate_code_is_owner_only() {
        let (groups, _) = setup(10).await;
        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        groups.join_group(&group.invitation_code, "ann").await.unwrap();

        assert_matches!(
            groups.regenerate_invitation_code(group.id, "ann").await,
            Err(DomainError::NotOwner { .. })
        );
        let new_code = groups.regenerate_invitation_code(group.id, "owner").await.unwrap();
        assert_eq!(groups.get_invitation_code(group.id, "ann").await.unwrap(), new_code);
    }

    #[tokio::test]
    async fn test_list_user_groups_most_recent_first() {
        let (groups, _) = setup(10).await;
        let first = groups.create_group("owner", "First", None).await.unwrap();
        let second = groups.create_group("owner", "Second", None).await.unwrap();
        // Touch the first group so it becomes the most recent
        groups.join_group(&first.invitation_code, "ann").await.unwrap();

        let listed = groups.list_user_groups("owner").await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_group_stats() {
        let (groups, _) = setup(10).await;
        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        groups.join_group(&group.invitation_code, "bob").await.unwrap();

        let stats = groups.group_stats(group.id, "bob").await.unwrap();
        assert_eq!(stats.member_count, 2);
        assert_eq!(stats.members_with_preferences, 0);
        assert!(!stats.is_owner);
    }
}
