use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use domain::{DomainError, GenrePreference, User, validate_display_name, validate_email};
use store::{Store, StoreError};

use super::{MAX_UPDATE_ATTEMPTS, committed, contention, storage_failure};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create the user on first authentication, or refresh email and display
    /// name of an existing one.
    #[instrument(skip(self, email, display_name))]
    pub async fn ensure_user(&self, user_id: &str, email: &str, display_name: &str) -> domain::Result<User> {
        let email = validate_email(email)?;
        let display_name = validate_display_name(display_name)?;

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            match self.store.get_user(user_id).await.map_err(storage_failure)? {
                Some(mut user) => {
                    if user.email == email && user.display_name == display_name {
                        return Ok(user);
                    }
                    user.update_profile(Some(&display_name), Some(&email), Utc::now())?;
                    if let Some(saved) = committed(self.store.replace_user(user).await)? {
                        return Ok(saved);
                    }
                }
                None => {
                    let user = User::new(user_id, email.clone(), display_name.clone(), Utc::now());
                    match self.store.insert_user(user).await {
                        Ok(saved) => {
                            info!(user_id, "user created");
                            return Ok(saved);
                        }
                        // Concurrent first login; read the winner's record next round
                        Err(StoreError::Duplicate { .. }) => continue,
                        Err(e) => return Err(storage_failure(e)),
                    }
                }
            }
        }
        Err(contention("user", user_id))
    }

    pub async fn get_user(&self, user_id: &str) -> domain::Result<User> {
        self.store
            .get_user(user_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }

    /// Like `get_user`, but inactive users are rejected.
    pub async fn get_active_user(&self, user_id: &str) -> domain::Result<User> {
        let user = self.get_user(user_id).await?;
        user.ensure_active()?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> domain::Result<User> {
        self.update(user_id, |user| {
            user.ensure_active()?;
            user.update_profile(display_name, email, Utc::now())
        })
        .await
    }

    /// Replace the user's global preferences (seed for groups joined later).
    #[instrument(skip(self, preferences), fields(count = preferences.len()))]
    pub async fn set_user_preferences(
        &self,
        user_id: &str,
        preferences: Vec<GenrePreference>,
    ) -> domain::Result<User> {
        if preferences.is_empty() {
            return Err(DomainError::validation("at least one genre must be selected"));
        }
        self.update(user_id, |user| {
            user.ensure_active()?;
            user.set_preferences(preferences.clone(), Utc::now())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, user_id: &str) -> domain::Result<User> {
        let user = self.update(user_id, |user| user.deactivate(Utc::now())).await?;
        info!(user_id, "user deactivated");
        Ok(user)
    }

    async fn update<F>(&self, user_id: &str, mut apply: F) -> domain::Result<User>
    where
        F: FnMut(&mut User) -> domain::Result<()>,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut user = self.get_user(user_id).await?;
            apply(&mut user)?;
            if let Some(saved) = committed(self.store.replace_user(user).await)? {
                return Ok(saved);
            }
        }
        Err(contention("user", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use store::InMemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_ensure_user_creates_then_refreshes() {
        let users = service();
        let created = users.ensure_user("u1", "a@example.com", "Ann").await.unwrap();
        assert_eq!(created.version, 0);

        let same = users.ensure_user("u1", "a@example.com", "Ann").await.unwrap();
        assert_eq!(same.version, 0);

        let renamed = users.ensure_user("u1", "a@example.com", "Annie").await.unwrap();
        assert_eq!(renamed.display_name, "Annie");
        assert_eq!(renamed.version, 1);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        assert_matches!(service().get_user("ghost").await, Err(DomainError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_update() {
        let users = service();
        users.ensure_user("u1", "a@example.com", "Ann").await.unwrap();
        users.deactivate_user("u1").await.unwrap();

        assert_matches!(
            users.update_profile("u1", Some("New"), None).await,
            Err(DomainError::UserInactive(_))
        );
        assert_matches!(users.get_active_user("u1").await, Err(DomainError::UserInactive(_)));
    }

    #[tokio::test]
    async fn test_set_user_preferences_requires_entries() {
        let users = service();
        users.ensure_user("u1", "a@example.com", "Ann").await.unwrap();
        assert_matches!(
            users.set_user_preferences("u1", Vec::new()).await,
            Err(DomainError::Validation(_))
        );
        let user = users
            .set_user_preferences("u1", vec![GenrePreference::new(35, " Comedy ", 6)])
            .await
            .unwrap();
        assert_eq!(user.preferences[0].genre_name, "Comedy");
    }
}
