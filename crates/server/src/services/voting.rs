//! Voting session lifecycle, votes and results.
//!
//! ## Algorithm (session creation)
//! 1. The group must exist, be active, and the caller must own it
//! 2. Settings are validated
//! 3. An open session for the group is rejected early; the store's
//!    one-open-session constraint is what actually guarantees it
//! 4. With `require_all_members`, every member needs preferences
//! 5. The recommendation engine must return at least one candidate
//! 6. The session is inserted in `pending` with the candidate snapshot
//!
//! All transitions go through a versioned replace, so two concurrent
//! `end_session` calls cannot both complete the same session: the loser
//! reloads, sees `completed`, and fails with `SessionNotActive`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use domain::{
    DomainError, Group, GroupId, MovieCandidate, MovieId, MovieResult, SessionId, SessionSettings,
    SessionStatus, Vote, VoteValue, VotingSession, VotingStats,
};
use fanout::{Dispatcher, EventKind};
use store::{Store, StoreError};

use super::recommendations::RecommendationEngine;
use super::{MAX_UPDATE_ATTEMPTS, committed, contention, storage_failure};

/// Final outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResults {
    pub session_id: SessionId,
    pub group_id: GroupId,
    /// Ranked by score, best first
    pub results: Vec<MovieResult>,
    pub winner: Option<MovieCandidate>,
    pub total_votes: usize,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct VotingService {
    store: Arc<dyn Store>,
    engine: RecommendationEngine,
    notifications: Dispatcher,
}

impl VotingService {
    pub fn new(store: Arc<dyn Store>, engine: RecommendationEngine, notifications: Dispatcher) -> Self {
        Self {
            store,
            engine,
            notifications,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    #[instrument(skip(self, settings))]
    pub async fn create_session(
        &self,
        group_id: GroupId,
        caller: &str,
        settings: SessionSettings,
    ) -> domain::Result<VotingSession> {
        let group = self.load_group(group_id).await?;
        group.ensure_active()?;
        group.ensure_owner(caller, "create a voting session")?;
        settings.validate()?;

        if self
            .store
            .find_open_for_group(group_id)
            .await
            .map_err(storage_failure)?
            .is_some()
        {
            return Err(DomainError::SessionAlreadyActive(group_id));
        }

        if settings.require_all_members {
            let missing = group.members_without_preferences().count();
            if missing > 0 {
                return Err(DomainError::PreferencesIncomplete { group_id, missing });
            }
        }

        let candidates = self
            .engine
            .recommend(&group, settings.max_recommendations)
            .await?;
        if candidates.is_empty() {
            return Err(DomainError::NoRecommendations(group_id));
        }

        let session = VotingSession::new(group_id, group.owner_id.clone(), candidates, settings, Utc::now());
        let saved = self
            .store
            .insert_session(session)
            .await
            .map_err(storage_failure)?;

        info!(session_id = %saved.id, candidates = saved.candidates.len(), "voting session created");
        self.notifications
            .group(
                group_id,
                EventKind::SessionCreated,
                json!({ "sessionId": saved.id, "groupId": group_id, "candidates": saved.candidates.len() }),
            )
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn start_session(&self, session_id: SessionId, caller: &str) -> domain::Result<VotingSession> {
        let saved = self
            .update(session_id, |session| session.start(caller, Utc::now()))
            .await?;

        info!(%session_id, "voting session started");
        self.notifications
            .group(
                saved.group_id,
                EventKind::SessionStarted,
                json!({
                    "sessionId": session_id,
                    "startedAt": saved.started_at,
                    "deadline": saved.deadline(),
                }),
            )
            .await;
        Ok(saved)
    }

    /// Record or replace the caller's vote on one candidate.
    #[instrument(skip(self))]
    pub async fn cast_vote(
        &self,
        session_id: SessionId,
        user_id: &str,
        movie_id: MovieId,
        value: VoteValue,
    ) -> domain::Result<Vote> {
        let session = self.load(session_id).await?;
        if session.status != SessionStatus::Active {
            return Err(DomainError::SessionNotActive {
                session_id,
                status: session.status,
            });
        }
        let group = self.load_group(session.group_id).await?;
        group.ensure_member(user_id)?;

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut session = self.load(session_id).await?;
            let vote = session.cast_vote(user_id, movie_id, value, Utc::now())?;
            if committed(self.store.replace_session(session).await)?.is_some() {
                debug!(%session_id, user_id, movie_id, %value, "vote recorded");
                self.notifications
                    .group(
                        group.id,
                        EventKind::VoteCast,
                        json!({ "sessionId": session_id, "userId": user_id, "movieId": movie_id, "vote": value }),
                    )
                    .await;
                return Ok(vote);
            }
        }
        Err(contention("session", session_id))
    }

    /// `active -> completed`: tally, pick the winner, store the results.
    #[instrument(skip(self))]
    pub async fn end_session(&self, session_id: SessionId, caller: &str) -> domain::Result<SessionResults> {
        let saved = self
            .update(session_id, |session| session.complete(caller, Utc::now()))
            .await?;

        info!(%session_id, winner = ?saved.winner_id, votes = saved.votes.len(), "voting session ended");
        self.announce_end(&saved).await;
        Ok(results_of(saved))
    }

    #[instrument(skip(self))]
    pub async fn cancel_session(&self, session_id: SessionId, caller: &str) -> domain::Result<VotingSession> {
        let saved = self
            .update(session_id, |session| session.cancel(caller, Utc::now()))
            .await?;

        info!(%session_id, "voting session cancelled");
        self.notifications
            .group(saved.group_id, EventKind::SessionCancelled, json!({ "sessionId": session_id }))
            .await;
        Ok(saved)
    }

    /// Complete every active session whose voting window has closed.
    /// Returns the ids of the sessions this call completed.
    #[instrument(skip(self))]
    pub async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> domain::Result<Vec<SessionId>> {
        let open = self.store.list_open().await.map_err(storage_failure)?;
        let mut expired = Vec::new();

        for session in open.into_iter().filter(|s| s.is_overdue(now)) {
            match self.update(session.id, |s| s.expire(now)).await {
                Ok(saved) => {
                    info!(session_id = %saved.id, winner = ?saved.winner_id, "voting session expired");
                    self.announce_end(&saved).await;
                    self.notifications
                        .user(
                            &saved.owner_id,
                            EventKind::SessionEnded,
                            json!({ "sessionId": saved.id, "reason": "expired" }),
                        )
                        .await;
                    expired.push(saved.id);
                }
                // Ended or cancelled by the owner since the listing
                Err(DomainError::SessionNotActive { .. }) => {
                    debug!(session_id = %session.id, "session closed before expiry");
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "failed to expire session");
                }
            }
        }
        Ok(expired)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_session(&self, session_id: SessionId, caller: &str) -> domain::Result<VotingSession> {
        let session = self.load(session_id).await?;
        self.ensure_can_view(session.group_id, caller).await?;
        Ok(session)
    }

    /// The group's pending or active session, if any.
    pub async fn get_active_session(&self, group_id: GroupId, caller: &str) -> domain::Result<Option<VotingSession>> {
        self.ensure_can_view(group_id, caller).await?;
        self.store
            .find_open_for_group(group_id)
            .await
            .map_err(storage_failure)
    }

    pub async fn get_votes(&self, session_id: SessionId, caller: &str) -> domain::Result<Vec<Vote>> {
        Ok(self.get_session(session_id, caller).await?.votes)
    }

    pub async fn get_user_votes(&self, session_id: SessionId, user_id: &str) -> domain::Result<Vec<Vote>> {
        let session = self.get_session(session_id, user_id).await?;
        Ok(session.votes_by(user_id).cloned().collect())
    }

    /// Tally of an active session so far. Not authoritative; the stored
    /// results are computed once, when the session ends.
    pub async fn live_tally(&self, session_id: SessionId, caller: &str) -> domain::Result<Vec<MovieResult>> {
        let session = self.get_session(session_id, caller).await?;
        if session.status != SessionStatus::Active {
            return Err(DomainError::SessionNotActive {
                session_id,
                status: session.status,
            });
        }
        Ok(session.live_tally())
    }

    pub async fn get_results(&self, session_id: SessionId, caller: &str) -> domain::Result<SessionResults> {
        let session = self.get_session(session_id, caller).await?;
        if session.status != SessionStatus::Completed {
            return Err(DomainError::ResultsNotAvailable {
                session_id,
                status: session.status,
            });
        }
        Ok(results_of(session))
    }

    /// Every session of the group, newest first. Readable after the group
    /// has been deleted.
    pub async fn get_history(&self, group_id: GroupId, caller: &str) -> domain::Result<Vec<VotingSession>> {
        self.ensure_can_view(group_id, caller).await?;
        self.store
            .list_for_group(group_id)
            .await
            .map_err(storage_failure)
    }

    pub async fn voting_stats(&self, session_id: SessionId, caller: &str) -> domain::Result<VotingStats> {
        let session = self.load(session_id).await?;
        let group = self.ensure_can_view(session.group_id, caller).await?;
        Ok(session.stats(group.member_count()))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn announce_end(&self, session: &VotingSession) {
        let winner = session.winner().map(|w| json!({ "movieId": w.movie_id, "title": w.title }));
        self.notifications
            .group(
                session.group_id,
                EventKind::SessionEnded,
                json!({ "sessionId": session.id, "winner": winner, "totalVotes": session.votes.len() }),
            )
            .await;
    }

    /// Membership check that also works for deleted groups.
    async fn ensure_can_view(&self, group_id: GroupId, caller: &str) -> domain::Result<Group> {
        let group = self.load_group(group_id).await?;
        group.ensure_member(caller)?;
        Ok(group)
    }

    async fn load(&self, session_id: SessionId) -> domain::Result<VotingSession> {
        self.store
            .get_session(session_id)
            .await
            .map_err(storage_failure)?
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    async fn load_group(&self, group_id: GroupId) -> domain::Result<Group> {
        self.store
            .get_group(group_id)
            .await
            .map_err(storage_failure)?
            .ok_or(DomainError::GroupNotFound(group_id))
    }

    async fn update<F>(&self, session_id: SessionId, mut apply: F) -> domain::Result<VotingSession>
    where
        F: FnMut(&mut VotingSession) -> domain::Result<()>,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut session = self.load(session_id).await?;
            apply(&mut session)?;
            match self.store.replace_session(session).await {
                Ok(saved) => return Ok(saved),
                Err(e) if e.is_conflict() => continue,
                Err(StoreError::NotFound { .. }) => return Err(DomainError::SessionNotFound(session_id)),
                Err(e) => return Err(storage_failure(e)),
            }
        }
        Err(contention("session", session_id))
    }
}

fn results_of(session: VotingSession) -> SessionResults {
    let winner = session.winner().cloned();
    SessionResults {
        session_id: session.id,
        group_id: session.group_id,
        total_votes: session.votes.len(),
        ended_at: session.ended_at,
        results: session.results,
        winner,
    }
}
