//! Storage ports.
//!
//! Every aggregate carries a `version`. `replace_*` only succeeds when the
//! stored version equals the version on the value being written; the store
//! then bumps it. Callers run read-modify-write loops on top of this.

use async_trait::async_trait;
use domain::{Group, GroupId, SessionId, User, UserId, VotingSession};

use crate::error::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Duplicate` if the id is taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Compare-and-swap on `user.version`.
    async fn replace_user(&self, user: User) -> Result<User>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Insert a new group. The invitation code must be unused among active groups.
    async fn insert_group(&self, group: Group) -> Result<Group>;

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>>;

    /// Look up an active group by its normalized invitation code.
    async fn find_by_invitation_code(&self, code: &str) -> Result<Option<Group>>;

    /// Active groups the user belongs to.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>>;

    async fn count_active_for_user(&self, user_id: &UserId) -> Result<usize>;

    /// Compare-and-swap on `group.version`.
    async fn replace_group(&self, group: Group) -> Result<Group>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session. Fails with `OpenSessionExists` if the group
    /// already has a pending or active session.
    async fn insert_session(&self, session: VotingSession) -> Result<VotingSession>;

    async fn get_session(&self, id: SessionId) -> Result<Option<VotingSession>>;

    /// The pending or active session of a group, if any.
    async fn find_open_for_group(&self, group_id: GroupId) -> Result<Option<VotingSession>>;

    /// All sessions of a group, newest first.
    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<VotingSession>>;

    /// Every pending or active session across groups.
    async fn list_open(&self) -> Result<Vec<VotingSession>>;

    /// Compare-and-swap on `session.version`.
    async fn replace_session(&self, session: VotingSession) -> Result<VotingSession>;
}

/// Convenience bound for backends that hold every aggregate.
pub trait Store: UserStore + GroupStore + SessionStore {}

impl<T: UserStore + GroupStore + SessionStore> Store for T {}
