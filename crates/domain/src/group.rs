//! Group aggregate: membership rules and invitation codes.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{DomainError, Result};
use crate::preferences::{normalize_preferences, validate_preferences};
use crate::types::{GenrePreference, Group, Member, UserId};

pub const INVITATION_CODE_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

const INVITATION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random 8-character uppercase alphanumeric invitation code.
pub fn generate_invitation_code() -> String {
    let mut rng = rand::rng();
    (0..INVITATION_CODE_LEN)
        .map(|_| INVITATION_ALPHABET[rng.random_range(0..INVITATION_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form used for lookups; codes are case-insensitive.
pub fn normalize_invitation_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl Group {
    /// Create a new active group whose only member is the owner.
    pub fn new(
        name: &str,
        description: Option<&str>,
        owner_id: impl Into<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        let owner_id = owner_id.into();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            members: vec![Member::new(owner_id.clone(), now)],
            owner_id,
            invitation_code: generate_invitation_code(),
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members that have not set any genre preference yet
    pub fn members_without_preferences(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| !m.has_preferences())
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(DomainError::GroupInactive(self.id))
        }
    }

    pub fn ensure_owner(&self, user_id: &str, action: &'static str) -> Result<()> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(DomainError::NotOwner { action })
        }
    }

    pub fn ensure_member(&self, user_id: &str) -> Result<()> {
        if self.is_member(user_id) {
            Ok(())
        } else {
            Err(DomainError::NotAMember {
                user_id: user_id.to_string(),
                group_id: self.id,
            })
        }
    }

    // Mutators - callers persist the result through a versioned replace

    pub fn add_member(&mut self, member: Member, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        if self.is_member(&member.user_id) {
            return Err(DomainError::AlreadyMember {
                user_id: member.user_id,
                group_id: self.id,
            });
        }
        self.members.push(member);
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_member(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.ensure_member(user_id)?;
        if self.is_owner(user_id) {
            return Err(DomainError::OwnerCannotLeave);
        }
        self.members.retain(|m| m.user_id != user_id);
        self.updated_at = now;
        Ok(())
    }

    /// Replace one member's preference list. An empty list clears it.
    pub fn set_member_preferences(
        &mut self,
        user_id: &str,
        preferences: Vec<GenrePreference>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        if !preferences.is_empty() {
            validate_preferences(&preferences)?;
        }
        let group_id = self.id;
        let member = self
            .members
            .iter_mut()
            .find(|m| m.user_id == user_id)
            .ok_or_else(|| DomainError::NotAMember {
                user_id: user_id.to_string(),
                group_id,
            })?;
        member.preferences = normalize_preferences(preferences);
        self.updated_at = now;
        Ok(())
    }

    pub fn regenerate_invitation_code(&mut self, now: DateTime<Utc>) {
        self.invitation_code = generate_invitation_code();
        self.updated_at = now;
    }

    /// Soft delete. History referencing the group stays queryable.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.is_active = false;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("group name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "group name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(DomainError::Validation(
            format!("description must be at most {} characters", MAX_DESCRIPTION_LEN),
        )),
        Some(d) => Ok(Some(d.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn group() -> Group {
        Group::new("Friday Night", Some("  weekly pick "), "owner", Utc::now()).unwrap()
    }

    #[test]
    fn test_new_group_has_owner_as_sole_member() {
        let g = group();
        assert_eq!(g.member_count(), 1);
        assert!(g.is_member("owner"));
        assert!(g.is_owner("owner"));
        assert_eq!(g.description.as_deref(), Some("weekly pick"));
        assert!(g.is_active);
    }

    #[test]
    fn test_invitation_code_format() {
        for _ in 0..50 {
            let code = generate_invitation_code();
            assert_eq!(code.len(), INVITATION_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
        assert_eq!(normalize_invitation_code(" ab12cd34 "), "AB12CD34");
    }

    #[test]
    fn test_name_validation() {
        assert_matches!(Group::new("   ", None, "o", Utc::now()), Err(DomainError::Validation(_)));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert_matches!(Group::new(&long, None, "o", Utc::now()), Err(DomainError::Validation(_)));
        let long_desc = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert_matches!(
            Group::new("ok", Some(&long_desc), "o", Utc::now()),
            Err(DomainError::Validation(_))
        );
    }

    #[test]
    fn test_add_and_remove_member() {
        let mut g = group();
        g.add_member(Member::new("alice", Utc::now()), Utc::now()).unwrap();
        assert_eq!(g.member_count(), 2);

        assert_matches!(
            g.add_member(Member::new("alice", Utc::now()), Utc::now()),
            Err(DomainError::AlreadyMember { .. })
        );

        g.remove_member("alice", Utc::now()).unwrap();
        assert!(!g.is_member("alice"));
        assert_matches!(g.remove_member("alice", Utc::now()), Err(DomainError::NotAMember { .. }));
    }

    #[test]
    fn test_owner_cannot_leave() {
        let mut g = group();
        assert_matches!(g.remove_member("owner", Utc::now()), Err(DomainError::OwnerCannotLeave));
    }

    #[test]
    fn test_set_member_preferences() {
        let mut g = group();
        g.set_member_preferences("owner", vec![GenrePreference::new(35, " Comedy", 6)], Utc::now())
            .unwrap();
        let member = g.member("owner").unwrap();
        assert_eq!(member.preferences[0].genre_name, "Comedy");
        assert_eq!(g.members_without_preferences().count(), 0);

        assert_matches!(
            g.set_member_preferences("stranger", vec![GenrePreference::new(35, "Comedy", 6)], Utc::now()),
            Err(DomainError::NotAMember { .. })
        );
    }

    #[test]
    fn test_deactivated_group_rejects_changes() {
        let mut g = group();
        g.deactivate(Utc::now()).unwrap();
        assert_matches!(g.deactivate(Utc::now()), Err(DomainError::GroupInactive(_)));
        assert_matches!(
            g.add_member(Member::new("bob", Utc::now()), Utc::now()),
            Err(DomainError::GroupInactive(_))
        );
    }
}
