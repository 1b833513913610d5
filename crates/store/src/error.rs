use domain::{DomainError, GroupId};
use thiserror::Error;

/// Failures reported by a store backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The record changed since it was read. Reload and retry.
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("group {0} already has an open voting session")]
    OpenSessionExists(GroupId),

    #[error("invitation code already in use: {0}")]
    DuplicateInvitationCode(String),

    #[error("{entity} already exists: {id}")]
    Duplicate { entity: &'static str, id: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Store failures that reach a client keep their meaning where one exists;
/// everything else is reported as a generic internal error.
impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OpenSessionExists(group_id) => DomainError::SessionAlreadyActive(group_id),
            StoreError::Duplicate { entity, id } => {
                DomainError::AlreadyExists(format!("{} {}", entity, id))
            }
            StoreError::NotFound { entity, id } => {
                DomainError::Internal(format!("{} {} disappeared", entity, id))
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}
