//! Per-group member preferences and their group-level views.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use domain::{DomainError, GenrePreference, Group, GroupId, UserId, validate_preferences};
use pipeline::{GenreStats, GroupPreferences, aggregate_preferences, genre_stats};

use super::groups::GroupService;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPreferences {
    pub user_id: UserId,
    pub preferences: Vec<GenrePreference>,
}

#[derive(Clone)]
pub struct PreferenceService {
    groups: GroupService,
}

impl PreferenceService {
    pub fn new(groups: GroupService) -> Self {
        Self { groups }
    }

    /// Replace the caller's preference list in one group.
    #[instrument(skip(self, preferences), fields(count = preferences.len()))]
    pub async fn set_member_preferences(
        &self,
        group_id: GroupId,
        user_id: &str,
        preferences: Vec<GenrePreference>,
    ) -> domain::Result<Vec<GenrePreference>> {
        validate_preferences(&preferences)?;
        let saved = self
            .groups
            .update(group_id, |group| {
                group.set_member_preferences(user_id, preferences.clone(), Utc::now())
            })
            .await?;
        info!(%group_id, user_id, "member preferences updated");
        Ok(member_list(&saved, user_id))
    }

    pub async fn get_member_preferences(
        &self,
        group_id: GroupId,
        user_id: &str,
    ) -> domain::Result<Vec<GenrePreference>> {
        let group = self.groups.get_group(group_id, user_id).await?;
        Ok(member_list(&group, user_id))
    }

    #[instrument(skip(self))]
    pub async fn clear_member_preferences(&self, group_id: GroupId, user_id: &str) -> domain::Result<()> {
        self.groups
            .update(group_id, |group| {
                group.set_member_preferences(user_id, Vec::new(), Utc::now())
            })
            .await?;
        info!(%group_id, user_id, "member preferences cleared");
        Ok(())
    }

    /// Every member's list, in membership order.
    pub async fn group_preferences(&self, group_id: GroupId, caller: &str) -> domain::Result<Vec<MemberPreferences>> {
        let group = self.groups.get_group(group_id, caller).await?;
        Ok(group
            .members
            .into_iter()
            .map(|m| MemberPreferences {
                user_id: m.user_id,
                preferences: m.preferences,
            })
            .collect())
    }

    pub async fn has_preferences(&self, group_id: GroupId, user_id: &str) -> domain::Result<bool> {
        let group = self.groups.get_group(group_id, user_id).await?;
        Ok(group.member(user_id).is_some_and(|m| m.has_preferences()))
    }

    pub async fn genre_stats(&self, group_id: GroupId, caller: &str) -> domain::Result<GenreStats> {
        let group = self.groups.get_group(group_id, caller).await?;
        Ok(genre_stats(&group.members))
    }

    /// Group-level ranked and common genres. Fails when no member has
    /// preferences.
    pub async fn aggregate(&self, group_id: GroupId, caller: &str) -> domain::Result<GroupPreferences> {
        let group = self.groups.get_group(group_id, caller).await?;
        let aggregated = aggregate_preferences(group.id, &group.members);
        if aggregated.is_empty() {
            return Err(DomainError::InsufficientData(group_id));
        }
        Ok(aggregated)
    }
}

fn member_list(group: &Group, user_id: &str) -> Vec<GenrePreference> {
    group
        .member(user_id)
        .map(|m| m.preferences.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::UserService;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use fanout::{Dispatcher, LogNotifier};
    use store::{InMemoryStore, Store};

    const COMEDY: u32 = 35;
    const DRAMA: u32 = 18;

    async fn setup() -> (PreferenceService, GroupId) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let users = UserService::new(store.clone());
        for id in ["owner", "ann", "bob", "cat"] {
            users
                .ensure_user(id, &format!("{}@example.com", id), id)
                .await
                .unwrap();
        }
        let groups = GroupService::new(store, Dispatcher::new(Arc::new(LogNotifier)), 10);
        let group = groups.create_group("owner", "Film Club", None).await.unwrap();
        for id in ["ann", "bob", "cat"] {
            groups.join_group(&group.invitation_code, id).await.unwrap();
        }
        (PreferenceService::new(groups), group.id)
    }

    fn prefs(list: &[(u32, &str, u8)]) -> Vec<GenrePreference> {
        list.iter()
            .map(|(id, name, w)| GenrePreference::new(*id, *name, *w))
            .collect()
    }

    #[tokio::test]
    async fn test_set_get_and_clear() {
        let (service, group_id) = setup().await;
        service
            .set_member_preferences(group_id, "ann", prefs(&[(COMEDY, " Comedy ", 7)]))
            .await
            .unwrap();

        let stored = service.get_member_preferences(group_id, "ann").await.unwrap();
        assert_eq!(stored, prefs(&[(COMEDY, "Comedy", 7)]));
        assert!(service.has_preferences(group_id, "ann").await.unwrap());

        service.clear_member_preferences(group_id, "ann").await.unwrap();
        assert!(!service.has_preferences(group_id, "ann").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_lists_are_rejected() {
        let (service, group_id) = setup().await;
        assert_matches!(
            service.set_member_preferences(group_id, "ann", Vec::new()).await,
            Err(DomainError::Validation(_))
        );
        assert_matches!(
            service
                .set_member_preferences(group_id, "ann", prefs(&[(COMEDY, "Comedy", 11)]))
                .await,
            Err(DomainError::Validation(_))
        );
        assert_matches!(
            service
                .set_member_preferences(group_id, "stranger", prefs(&[(COMEDY, "Comedy", 5)]))
                .await,
            Err(DomainError::NotAMember { .. })
        );
    }

    #[tokio::test]
    async fn test_aggregate_majority_genres() {
        let (service, group_id) = setup().await;
        for (user, weight) in [("owner", 5), ("ann", 7), ("bob", 9)] {
            service
                .set_member_preferences(group_id, user, prefs(&[(COMEDY, "Comedy", weight)]))
                .await
                .unwrap();
        }
        service
            .set_member_preferences(group_id, "cat", prefs(&[(DRAMA, "Drama", 10)]))
            .await
            .unwrap();

        let aggregated = service.aggregate(group_id, "owner").await.unwrap();
        assert_eq!(aggregated.ranked_preferences[0].genre_id, COMEDY);
        assert_eq!(aggregated.ranked_preferences[0].weight, 21);
        assert_eq!(aggregated.ranked_preferences[1].weight, 10);
        assert_eq!(aggregated.common_weight(COMEDY), Some(7));
        assert_eq!(aggregated.common_weight(DRAMA), None);

        let stats = service.genre_stats(group_id, "cat").await.unwrap();
        assert_eq!(stats.members_with_preferences, 4);
        assert_eq!(stats.most_popular, vec!["Comedy", "Drama"]);
        assert_eq!(stats.genres[0].percentage, 75);
    }

    #[tokio::test]
    async fn test_aggregate_without_preferences_is_insufficient() {
        let (service, group_id) = setup().await;
        assert_matches!(
            service.aggregate(group_id, "owner").await,
            Err(DomainError::InsufficientData(_))
        );
        let all = service.group_preferences(group_id, "bob").await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|m| m.preferences.is_empty()));
    }
}
