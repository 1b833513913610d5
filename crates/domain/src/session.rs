//! Voting session state machine, vote upserts and winner selection.
//!
//! ## Transitions
//! ```text
//! pending --start--> active --end/expire--> completed
//!                      \-----cancel------> cancelled
//! ```
//! Terminal states are never left. Every transition checks the caller and
//! the current status and reports which one failed.
//!
//! ## Winner Selection
//! 1. Tally yes/no votes per candidate, `score = yes - no + 0.1 * rating`
//! 2. No votes at all: the best catalog rating wins
//! 3. Otherwise the best score among movies with at least one yes vote wins
//!    (best score over all candidates if nobody voted yes)
//! 4. Exact ties go to the earlier candidate

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{DomainError, Result};
use crate::types::{
    GroupId, MovieCandidate, MovieId, MovieResult, SessionSettings, SessionStatus, UserId, Vote,
    VoteValue, VotingSession, VotingStats,
};

/// Rating contribution used to break vote ties.
pub const RATING_TIE_BREAK_FACTOR: f64 = 0.1;

pub const MIN_RECOMMENDATIONS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 20;
pub const MIN_VOTING_MINUTES: u32 = 15;
pub const MAX_VOTING_MINUTES: u32 = 1440;

impl SessionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RECOMMENDATIONS..=MAX_RECOMMENDATIONS).contains(&self.max_recommendations) {
            return Err(DomainError::Validation(format!(
                "maxRecommendations must be between {} and {}, got {}",
                MIN_RECOMMENDATIONS, MAX_RECOMMENDATIONS, self.max_recommendations
            )));
        }
        if !(MIN_VOTING_MINUTES..=MAX_VOTING_MINUTES).contains(&self.voting_duration_minutes) {
            return Err(DomainError::Validation(format!(
                "votingDuration must be between {} and {} minutes, got {}",
                MIN_VOTING_MINUTES, MAX_VOTING_MINUTES, self.voting_duration_minutes
            )));
        }
        Ok(())
    }
}

impl VotingSession {
    /// Create a pending session holding a snapshot of the candidates.
    pub fn new(
        group_id: GroupId,
        owner_id: impl Into<UserId>,
        candidates: Vec<MovieCandidate>,
        settings: SessionSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            owner_id: owner_id.into(),
            status: SessionStatus::Pending,
            settings,
            candidates,
            votes: Vec::new(),
            results: Vec::new(),
            winner_id: None,
            created_at: now,
            started_at: None,
            ended_at: None,
            version: 0,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn candidate(&self, movie_id: MovieId) -> Option<&MovieCandidate> {
        self.candidates.iter().find(|c| c.movie_id == movie_id)
    }

    pub fn winner(&self) -> Option<&MovieCandidate> {
        self.winner_id.and_then(|id| self.candidate(id))
    }

    /// `pending -> active`
    pub fn start(&mut self, caller: &str, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(caller, "start a voting session")?;
        if self.status != SessionStatus::Pending {
            return Err(DomainError::SessionNotPending {
                session_id: self.id,
                status: self.status,
            });
        }
        self.status = SessionStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// Record a vote, replacing any earlier vote by the same user on the same movie.
    ///
    /// Membership is checked by the caller, which holds the group.
    pub fn cast_vote(
        &mut self,
        user_id: &str,
        movie_id: MovieId,
        value: VoteValue,
        now: DateTime<Utc>,
    ) -> Result<Vote> {
        self.ensure_active()?;
        if self.candidate(movie_id).is_none() {
            return Err(DomainError::InvalidMovie {
                session_id: self.id,
                movie_id,
            });
        }

        let vote = Vote {
            session_id: self.id,
            user_id: user_id.to_string(),
            movie_id,
            value,
            cast_at: now,
        };
        match self
            .votes
            .iter_mut()
            .find(|v| v.user_id == user_id && v.movie_id == movie_id)
        {
            Some(existing) => *existing = vote.clone(),
            None => self.votes.push(vote.clone()),
        }
        Ok(vote)
    }

    /// `active -> completed`, triggered by the owner.
    pub fn complete(&mut self, caller: &str, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(caller, "end a voting session")?;
        self.ensure_active()?;
        self.finish(now);
        Ok(())
    }

    /// `active -> completed`, triggered by the voting duration running out.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.finish(now);
        Ok(())
    }

    /// `active -> cancelled`. No results are computed.
    pub fn cancel(&mut self, caller: &str, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(caller, "cancel a voting session")?;
        self.ensure_active()?;
        self.status = SessionStatus::Cancelled;
        self.ended_at = Some(now);
        Ok(())
    }

    /// When the advisory voting window closes, if the session has started.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .map(|started| started + Duration::minutes(i64::from(self.settings.voting_duration_minutes)))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.deadline().is_some_and(|d| now >= d)
    }

    /// Non-authoritative tally of the votes so far, in ranking order.
    pub fn live_tally(&self) -> Vec<MovieResult> {
        rank_results(tally_votes(&self.candidates, &self.votes))
    }

    pub fn votes_by<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Vote> + 'a {
        self.votes.iter().filter(move |v| v.user_id == user_id)
    }

    pub fn stats(&self, total_members: usize) -> VotingStats {
        let voters: HashSet<&str> = self.votes.iter().map(|v| v.user_id.as_str()).collect();
        let voted_members = voters.len();
        let participation_rate = if total_members > 0 {
            ((voted_members as f64 / total_members as f64) * 100.0).round() as u32
        } else {
            0
        };
        let yes_votes = self.votes.iter().filter(|v| v.value == VoteValue::Yes).count();

        VotingStats {
            total_members,
            voted_members,
            pending_members: total_members.saturating_sub(voted_members),
            participation_rate,
            total_votes: self.votes.len(),
            yes_votes,
            no_votes: self.votes.len() - yes_votes,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        let tallied = tally_votes(&self.candidates, &self.votes);
        self.winner_id = select_winner(&tallied);
        self.results = rank_results(tallied);
        self.status = SessionStatus::Completed;
        self.ended_at = Some(now);
    }

    fn ensure_owner(&self, caller: &str, action: &'static str) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(DomainError::NotOwner { action })
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == SessionStatus::Active {
            Ok(())
        } else {
            Err(DomainError::SessionNotActive {
                session_id: self.id,
                status: self.status,
            })
        }
    }
}

/// Count votes per candidate. Output follows candidate order.
pub fn tally_votes(candidates: &[MovieCandidate], votes: &[Vote]) -> Vec<MovieResult> {
    let mut counts: HashMap<MovieId, (u32, u32)> = HashMap::new();
    for vote in votes {
        let entry = counts.entry(vote.movie_id).or_insert((0, 0));
        match vote.value {
            VoteValue::Yes => entry.0 += 1,
            VoteValue::No => entry.1 += 1,
        }
    }

    candidates
        .iter()
        .map(|candidate| {
            let (yes_votes, no_votes) = counts.get(&candidate.movie_id).copied().unwrap_or((0, 0));
            MovieResult {
                movie_id: candidate.movie_id,
                title: candidate.title.clone(),
                yes_votes,
                no_votes,
                total_votes: yes_votes + no_votes,
                rating: candidate.rating,
                score: f64::from(yes_votes) - f64::from(no_votes)
                    + RATING_TIE_BREAK_FACTOR * f64::from(candidate.rating),
            }
        })
        .collect()
}

/// Pick the winning movie from results listed in candidate order.
pub fn select_winner(results: &[MovieResult]) -> Option<MovieId> {
    // Strict comparisons keep the first candidate on exact ties
    fn best_by<'a>(
        items: impl Iterator<Item = &'a MovieResult>,
        key: impl Fn(&MovieResult) -> f64,
    ) -> Option<&'a MovieResult> {
        items.fold(None, |best, r| match best {
            Some(b) if key(r) <= key(b) => Some(b),
            _ => Some(r),
        })
    }

    if results.iter().all(|r| r.total_votes == 0) {
        return best_by(results.iter(), |r| f64::from(r.rating)).map(|r| r.movie_id);
    }

    best_by(results.iter().filter(|r| r.yes_votes > 0), |r| r.score)
        .or_else(|| best_by(results.iter(), |r| r.score))
        .map(|r| r.movie_id)
}

/// Stable sort by score, best first; equal scores keep candidate order.
fn rank_results(mut results: Vec<MovieResult>) -> Vec<MovieResult> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}
