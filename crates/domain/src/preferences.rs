//! Validation rules for genre preference lists.

use std::collections::HashSet;

use crate::error::{DomainError, Result};
use crate::types::GenrePreference;

pub const MIN_WEIGHT: u8 = 1;
pub const MAX_WEIGHT: u8 = 10;

/// Most genres a single member may list.
pub const MAX_GENRES: usize = 10;

/// Validate a full preference list before it replaces a stored one.
///
/// ## Rules
/// - at least one and at most `MAX_GENRES` entries
/// - every weight in `MIN_WEIGHT..=MAX_WEIGHT`
/// - genre ids unique within the list
/// - genre names non-blank
pub fn validate_preferences(preferences: &[GenrePreference]) -> Result<()> {
    if preferences.is_empty() {
        return Err(DomainError::validation("at least one genre must be selected"));
    }
    if preferences.len() > MAX_GENRES {
        return Err(DomainError::Validation(format!(
            "at most {} genres can be selected, got {}",
            MAX_GENRES,
            preferences.len()
        )));
    }

    let mut seen = HashSet::new();
    for pref in preferences {
        if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&pref.weight) {
            return Err(DomainError::Validation(format!(
                "weight for genre {} must be between {} and {}, got {}",
                pref.genre_id, MIN_WEIGHT, MAX_WEIGHT, pref.weight
            )));
        }
        if pref.genre_name.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "genre {} is missing a name",
                pref.genre_id
            )));
        }
        if !seen.insert(pref.genre_id) {
            return Err(DomainError::Validation(format!(
                "genre {} listed more than once",
                pref.genre_id
            )));
        }
    }
    Ok(())
}

/// Trim genre names so stored lists compare cleanly.
pub fn normalize_preferences(preferences: Vec<GenrePreference>) -> Vec<GenrePreference> {
    preferences
        .into_iter()
        .map(|mut pref| {
            pref.genre_name = pref.genre_name.trim().to_string();
            pref
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_valid_list() {
        let prefs = vec![
            GenrePreference::new(35, "Comedy", 1),
            GenrePreference::new(18, "Drama", 10),
        ];
        assert!(validate_preferences(&prefs).is_ok());
    }

    #[test]
    fn test_rejects_empty_list() {
        assert_matches!(validate_preferences(&[]), Err(DomainError::Validation(_)));
    }

    #[test]
    fn test_rejects_weight_out_of_range() {
        let zero = vec![GenrePreference::new(35, "Comedy", 0)];
        let eleven = vec![GenrePreference::new(35, "Comedy", 11)];
        assert_matches!(validate_preferences(&zero), Err(DomainError::Validation(_)));
        assert_matches!(validate_preferences(&eleven), Err(DomainError::Validation(_)));
    }

    #[test]
    fn test_rejects_duplicate_genre() {
        let prefs = vec![
            GenrePreference::new(35, "Comedy", 4),
            GenrePreference::new(35, "Comedy", 8),
        ];
        assert_matches!(validate_preferences(&prefs), Err(DomainError::Validation(msg)) if msg.contains("more than once"));
    }

    #[test]
    fn test_rejects_too_many_genres() {
        let prefs: Vec<_> = (1..=11)
            .map(|id| GenrePreference::new(id, format!("Genre {}", id), 5))
            .collect();
        assert_matches!(validate_preferences(&prefs), Err(DomainError::Validation(_)));
    }

    #[test]
    fn test_normalize_trims_names() {
        let prefs = normalize_preferences(vec![GenrePreference::new(27, "  Horror ", 3)]);
        assert_eq!(prefs[0].genre_name, "Horror");
    }
}
