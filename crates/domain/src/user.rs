//! User profile rules.

use chrono::{DateTime, Utc};

use crate::error::{DomainError, Result};
use crate::preferences::{normalize_preferences, validate_preferences};
use crate::types::{GenrePreference, User};

pub const MAX_DISPLAY_NAME_LEN: usize = 100;

impl User {
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(DomainError::UserInactive(self.id.clone()))
        }
    }

    /// Apply profile changes. `None` leaves a field untouched.
    pub fn update_profile(
        &mut self,
        display_name: Option<&str>,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(name) = display_name {
            self.display_name = validate_display_name(name)?;
        }
        if let Some(email) = email {
            self.email = validate_email(email)?;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Replace the global preference list. An empty list clears it.
    pub fn set_preferences(&mut self, preferences: Vec<GenrePreference>, now: DateTime<Utc>) -> Result<()> {
        if !preferences.is_empty() {
            validate_preferences(&preferences)?;
        }
        self.preferences = normalize_preferences(preferences);
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.is_active = false;
        self.updated_at = now;
        Ok(())
    }
}

pub fn validate_display_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("display name is required"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "display name must be at most {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_ascii_lowercase())
        }
        _ => Err(DomainError::Validation(format!("invalid email address: {}", email))),
    }
}
