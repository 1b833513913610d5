//! Core data model for groups, preferences and voting sessions.
//!
//! Every aggregate root (`User`, `Group`, `VotingSession`) carries a
//! `version` counter. Stores bump it on each successful replace and refuse
//! writes made against a stale copy, which is what keeps member and vote
//! updates atomic per document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DomainError;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identity handed to us by the external auth provider.
pub type UserId = String;

/// Unique identifier for a group.
pub type GroupId = Uuid;

/// Unique identifier for a voting session.
pub type SessionId = Uuid;

/// Movie id as issued by the movie catalog.
pub type MovieId = u32;

/// Genre id as issued by the movie catalog.
pub type GenreId = u32;

// =============================================================================
// Users and Preferences
// =============================================================================

/// A member's weighted interest in one genre.
///
/// `weight` runs from 1 (mild) to 10 (strong).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenrePreference {
    pub genre_id: GenreId,
    pub genre_name: String,
    pub weight: u8,
}

impl GenrePreference {
    pub fn new(genre_id: GenreId, genre_name: impl Into<String>, weight: u8) -> Self {
        Self {
            genre_id,
            genre_name: genre_name.into(),
            weight,
        }
    }
}

/// An authenticated user. Never hard-deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    /// Global preferences, used to seed a member's list when joining a group
    pub preferences: Vec<GenrePreference>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl User {
    pub fn new(
        id: impl Into<UserId>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            preferences: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// Membership entry embedded in a group document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    pub preferences: Vec<GenrePreference>,
}

impl Member {
    pub fn new(user_id: impl Into<UserId>, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            joined_at,
            preferences: Vec::new(),
        }
    }

    /// Builder-style helper used when seeding from global preferences
    pub fn with_preferences(mut self, preferences: Vec<GenrePreference>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn has_preferences(&self) -> bool {
        !self.preferences.is_empty()
    }
}

/// A group of users choosing a movie together.
///
/// The owner is always `members[0]`. Soft-deleted groups keep their data so
/// that voting history stays readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub invitation_code: String,
    pub members: Vec<Member>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

// =============================================================================
// Voting
// =============================================================================

/// A yes/no vote on one candidate movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Yes,
    No,
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteValue::Yes => write!(f, "yes"),
            VoteValue::No => write!(f, "no"),
        }
    }
}

impl FromStr for VoteValue {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(VoteValue::Yes),
            "no" => Ok(VoteValue::No),
            other => Err(DomainError::Validation(format!(
                "invalid vote value '{}', expected 'yes' or 'no'",
                other
            ))),
        }
    }
}

/// One user's vote on one movie within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub value: VoteValue,
    pub cast_at: DateTime<Utc>,
}

/// Voting session lifecycle: `Pending -> Active -> {Completed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Pending and active sessions count against the one-per-group limit.
    pub fn is_open(self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Active)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A movie proposed for voting, snapshotted at session creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCandidate {
    pub movie_id: MovieId,
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    /// Catalog rating (0-10) at snapshot time
    pub rating: f32,
    /// Recommendation score in [0, 100]
    pub score: f32,
    pub reason: String,
}

/// Per-movie tally computed when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResult {
    pub movie_id: MovieId,
    pub title: String,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub total_votes: u32,
    pub rating: f32,
    /// `yes - no + 0.1 * rating`
    pub score: f64,
}

/// Per-session settings chosen by the owner at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub max_recommendations: usize,
    /// Advisory countdown length, also used by the expiry sweeper
    pub voting_duration_minutes: u32,
    pub require_all_members: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            voting_duration_minutes: 60,
            require_all_members: true,
        }
    }
}

/// A timed voting session for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSession {
    pub id: SessionId,
    pub group_id: GroupId,
    /// Group owner at creation time; the only caller allowed to drive transitions
    pub owner_id: UserId,
    pub status: SessionStatus,
    pub settings: SessionSettings,
    pub candidates: Vec<MovieCandidate>,
    pub votes: Vec<Vote>,
    /// Ranked by score, empty until the session completes
    pub results: Vec<MovieResult>,
    pub winner_id: Option<MovieId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Participation numbers for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStats {
    pub total_members: usize,
    pub voted_members: usize,
    pub pending_members: usize,
    /// Rounded percentage of members who cast at least one vote
    pub participation_rate: u32,
    pub total_votes: usize,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}
