//! Preference aggregation for a group.
//!
//! ## Algorithm
//! 1. Sum every member's weight per genre id -> `ranked_preferences`,
//!    sorted by total weight descending (genre id ascending on ties)
//! 2. Count distinct members per genre. A genre listed by more than half of
//!    the group's members is a common genre; its weight is the rounded
//!    average weight among the members who listed it
//! 3. Keep each member's own list for individual scoring
//!
//! ## Design Note
//! The majority threshold uses the total member count, so members who have
//! not set preferences count against consensus.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use domain::{GenreId, GenrePreference, GroupId, Member, UserId};

/// Number of genre names reported as most popular by [`genre_stats`].
pub const MOST_POPULAR_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedGenre {
    pub genre_id: GenreId,
    pub genre_name: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPreferences {
    pub group_id: GroupId,
    pub member_count: usize,
    /// Sum of member weights per genre, highest first
    pub ranked_preferences: Vec<WeightedGenre>,
    /// Majority genres with their average weight, highest first
    pub common_genres: Vec<WeightedGenre>,
    /// Members that have preferences, keyed by user id
    pub individual_preferences: BTreeMap<UserId, Vec<GenrePreference>>,
}

impl GroupPreferences {
    /// True when no member has set any preference.
    pub fn is_empty(&self) -> bool {
        self.ranked_preferences.is_empty()
    }

    /// The `k` genres with the highest total weight.
    pub fn top_genres(&self, k: usize) -> &[WeightedGenre] {
        let end = k.min(self.ranked_preferences.len());
        &self.ranked_preferences[..end]
    }

    pub fn common_weight(&self, genre_id: GenreId) -> Option<u32> {
        self.common_genres
            .iter()
            .find(|g| g.genre_id == genre_id)
            .map(|g| g.weight)
    }
}

#[derive(Default)]
struct GenreTotals {
    name: String,
    total_weight: u32,
    members: usize,
}

/// Combine all members' preferences into group-level rankings.
///
/// # Arguments
/// * `group_id` - Group the members belong to
/// * `members` - Every member of the group, with or without preferences
pub fn aggregate_preferences(group_id: GroupId, members: &[Member]) -> GroupPreferences {
    let mut totals: HashMap<GenreId, GenreTotals> = HashMap::new();
    let mut individual_preferences = BTreeMap::new();

    for member in members.iter().filter(|m| m.has_preferences()) {
        for pref in &member.preferences {
            let entry = totals.entry(pref.genre_id).or_default();
            if entry.name.is_empty() {
                entry.name = pref.genre_name.clone();
            }
            entry.total_weight += u32::from(pref.weight);
            entry.members += 1;
        }
        individual_preferences.insert(member.user_id.clone(), member.preferences.clone());
    }

    let member_count = members.len();

    let mut ranked_preferences: Vec<WeightedGenre> = totals
        .iter()
        .map(|(&genre_id, t)| WeightedGenre {
            genre_id,
            genre_name: t.name.clone(),
            weight: t.total_weight,
        })
        .collect();
    sort_by_weight(&mut ranked_preferences);

    let mut common_genres: Vec<WeightedGenre> = totals
        .iter()
        .filter(|(_, t)| t.members * 2 > member_count)
        .map(|(&genre_id, t)| WeightedGenre {
            genre_id,
            genre_name: t.name.clone(),
            weight: (f64::from(t.total_weight) / t.members as f64).round() as u32,
        })
        .collect();
    sort_by_weight(&mut common_genres);

    GroupPreferences {
        group_id,
        member_count,
        ranked_preferences,
        common_genres,
        individual_preferences,
    }
}

fn sort_by_weight(genres: &mut [WeightedGenre]) {
    genres.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.genre_id.cmp(&b.genre_id)));
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreStat {
    pub genre_id: GenreId,
    pub genre_name: String,
    pub member_count: usize,
    /// Share of members with preferences that listed this genre, 0-100
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreStats {
    pub members_with_preferences: usize,
    pub genres: Vec<GenreStat>,
    pub most_popular: Vec<String>,
}

/// How many members picked each genre.
pub fn genre_stats(members: &[Member]) -> GenreStats {
    let with_prefs: Vec<&Member> = members.iter().filter(|m| m.has_preferences()).collect();
    let mut counts: HashMap<GenreId, (String, usize)> = HashMap::new();
    for member in &with_prefs {
        for pref in &member.preferences {
            counts
                .entry(pref.genre_id)
                .or_insert_with(|| (pref.genre_name.clone(), 0))
                .1 += 1;
        }
    }

    let total = with_prefs.len();
    let mut genres: Vec<GenreStat> = counts
        .into_iter()
        .map(|(genre_id, (genre_name, member_count))| GenreStat {
            genre_id,
            genre_name,
            member_count,
            percentage: ((member_count as f64 / total as f64) * 100.0).round() as u32,
        })
        .collect();
    genres.sort_by(|a, b| {
        b.member_count
            .cmp(&a.member_count)
            .then(a.genre_id.cmp(&b.genre_id))
    });

    let most_popular = genres
        .iter()
        .take(MOST_POPULAR_LIMIT)
        .map(|g| g.genre_name.clone())
        .collect();

    GenreStats {
        members_with_preferences: total,
        genres,
        most_popular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const COMEDY: GenreId = 35;
    const DRAMA: GenreId = 18;
    const HORROR: GenreId = 27;

    fn member(id: &str, prefs: &[(GenreId, &str, u8)]) -> Member {
        Member::new(id, Utc::now()).with_preferences(
            prefs
                .iter()
                .map(|&(gid, name, w)| GenrePreference::new(gid, name, w))
                .collect(),
        )
    }

    #[test]
    fn test_majority_and_ranking() {
        let members = vec![
            member("a", &[(COMEDY, "Comedy", 5)]),
            member("b", &[(COMEDY, "Comedy", 7)]),
            member("c", &[(COMEDY, "Comedy", 9)]),
            member("d", &[(DRAMA, "Drama", 10)]),
        ];
        let prefs = aggregate_preferences(GroupId::nil(), &members);

        assert_eq!(prefs.member_count, 4);
        assert_eq!(prefs.ranked_preferences[0].genre_id, COMEDY);
        assert_eq!(prefs.ranked_preferences[0].weight, 21);
        assert_eq!(prefs.ranked_preferences[1].genre_id, DRAMA);
        assert_eq!(prefs.ranked_preferences[1].weight, 10);

        assert_eq!(prefs.common_genres.len(), 1);
        assert_eq!(prefs.common_genres[0].genre_id, COMEDY);
        assert_eq!(prefs.common_genres[0].weight, 7);
        assert_eq!(prefs.common_weight(DRAMA), None);
    }

    #[test]
    fn test_exact_half_is_not_common() {
        let members = vec![
            member("a", &[(HORROR, "Horror", 8)]),
            member("b", &[(HORROR, "Horror", 8)]),
            member("c", &[(DRAMA, "Drama", 3)]),
            member("d", &[(DRAMA, "Drama", 3)]),
        ];
        let prefs = aggregate_preferences(GroupId::nil(), &members);
        assert!(prefs.common_genres.is_empty());
    }

    #[test]
    fn test_members_without_preferences_count_toward_threshold() {
        let members = vec![
            member("a", &[(COMEDY, "Comedy", 4)]),
            member("b", &[]),
            member("c", &[]),
        ];
        let prefs = aggregate_preferences(GroupId::nil(), &members);
        assert_eq!(prefs.ranked_preferences.len(), 1);
        assert!(prefs.common_genres.is_empty());
        assert_eq!(prefs.individual_preferences.len(), 1);
    }

    #[test]
    fn test_average_weight_rounds_half_up() {
        let members = vec![
            member("a", &[(COMEDY, "Comedy", 6)]),
            member("b", &[(COMEDY, "Comedy", 7)]),
        ];
        let prefs = aggregate_preferences(GroupId::nil(), &members);
        // 13 / 2 = 6.5
        assert_eq!(prefs.common_weight(COMEDY), Some(7));
    }

    #[test]
    fn test_no_preferences_is_empty() {
        let prefs = aggregate_preferences(GroupId::nil(), &[member("a", &[])]);
        assert!(prefs.is_empty());
        assert!(prefs.top_genres(5).is_empty());
    }

    #[test]
    fn test_ties_ordered_by_genre_id() {
        let members = vec![member("a", &[(HORROR, "Horror", 5), (DRAMA, "Drama", 5)])];
        let prefs = aggregate_preferences(GroupId::nil(), &members);
        let ids: Vec<_> = prefs.ranked_preferences.iter().map(|g| g.genre_id).collect();
        assert_eq!(ids, vec![DRAMA, HORROR]);
    }

    #[test]
    fn test_genre_stats() {
        let members = vec![
            member("a", &[(COMEDY, "Comedy", 5), (DRAMA, "Drama", 2)]),
            member("b", &[(COMEDY, "Comedy", 7)]),
            member("c", &[]),
        ];
        let stats = genre_stats(&members);
        assert_eq!(stats.members_with_preferences, 2);
        assert_eq!(stats.genres[0].genre_id, COMEDY);
        assert_eq!(stats.genres[0].percentage, 100);
        assert_eq!(stats.genres[1].percentage, 50);
        assert_eq!(stats.most_popular, vec!["Comedy", "Drama"]);
    }

    #[test]
    fn test_genre_stats_without_preferences() {
        let stats = genre_stats(&[member("a", &[])]);
        assert_eq!(stats.members_with_preferences, 0);
        assert!(stats.genres.is_empty());
    }
}
