//! Error taxonomy shared by every service.
//!
//! Each variant names the precise precondition that failed. `kind()` folds
//! them into the coarse categories a transport layer cares about.

use thiserror::Error;

use crate::types::{GroupId, MovieId, SessionId, SessionStatus, UserId};

/// Coarse error category, used to pick a status code at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotOwner,
    NotAMember,
    InvalidState,
    AlreadyExists,
    Validation,
    InsufficientData,
    CatalogUnavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status a controller should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::NotOwner | ErrorKind::NotAMember => 403,
            ErrorKind::InvalidState | ErrorKind::AlreadyExists => 409,
            ErrorKind::Validation => 400,
            ErrorKind::InsufficientData => 422,
            ErrorKind::CatalogUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

/// Errors raised by group, preference, recommendation and voting operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Group {0} not found")]
    GroupNotFound(GroupId),

    #[error("Voting session {0} not found")]
    SessionNotFound(SessionId),

    #[error("No active group uses invitation code {0}")]
    InvalidInvitationCode(String),

    #[error("Only the group owner can {action}")]
    NotOwner { action: &'static str },

    #[error("User {user_id} is not a member of group {group_id}")]
    NotAMember { user_id: UserId, group_id: GroupId },

    #[error("User {user_id} is already a member of group {group_id}")]
    AlreadyMember { user_id: UserId, group_id: GroupId },

    #[error("Group {0} is inactive")]
    GroupInactive(GroupId),

    #[error("User {0} is deactivated")]
    UserInactive(UserId),

    #[error("Voting session {session_id} is {status}, expected pending")]
    SessionNotPending {
        session_id: SessionId,
        status: SessionStatus,
    },

    #[error("Voting session {session_id} is {status}, expected active")]
    SessionNotActive {
        session_id: SessionId,
        status: SessionStatus,
    },

    #[error("Voting session {session_id} is {status}; results exist only for completed sessions")]
    ResultsNotAvailable {
        session_id: SessionId,
        status: SessionStatus,
    },

    #[error("The group owner cannot leave the group; delete it instead")]
    OwnerCannotLeave,

    #[error("User {user_id} already belongs to the maximum of {limit} groups")]
    GroupLimitReached { user_id: UserId, limit: usize },

    #[error("Group {0} already has a pending or active voting session")]
    SessionAlreadyActive(GroupId),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No member of group {0} has set genre preferences")]
    InsufficientData(GroupId),

    #[error("{missing} member(s) of group {group_id} have not set genre preferences")]
    PreferencesIncomplete { group_id: GroupId, missing: usize },

    #[error("No movie recommendations available for group {0}")]
    NoRecommendations(GroupId),

    #[error("Movie {movie_id} is not a candidate in voting session {session_id}")]
    InvalidMovie {
        session_id: SessionId,
        movie_id: MovieId,
    },

    #[error("Movie catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The detail is for logs only and never shown to callers.
    #[error("Internal error")]
    Internal(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::GroupNotFound(_)
            | DomainError::SessionNotFound(_)
            | DomainError::InvalidInvitationCode(_) => ErrorKind::NotFound,
            DomainError::NotOwner { .. } => ErrorKind::NotOwner,
            DomainError::NotAMember { .. } => ErrorKind::NotAMember,
            DomainError::GroupInactive(_)
            | DomainError::UserInactive(_)
            | DomainError::SessionNotPending { .. }
            | DomainError::SessionNotActive { .. }
            | DomainError::ResultsNotAvailable { .. }
            | DomainError::OwnerCannotLeave
            | DomainError::GroupLimitReached { .. } => ErrorKind::InvalidState,
            DomainError::AlreadyMember { .. }
            | DomainError::SessionAlreadyActive(_)
            | DomainError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            DomainError::Validation(_) | DomainError::InvalidMovie { .. } => ErrorKind::Validation,
            DomainError::InsufficientData(_)
            | DomainError::PreferencesIncomplete { .. }
            | DomainError::NoRecommendations(_) => ErrorKind::InsufficientData,
            DomainError::CatalogUnavailable(_) => ErrorKind::CatalogUnavailable,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DomainError>;
