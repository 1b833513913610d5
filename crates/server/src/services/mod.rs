//! Application services.
//!
//! Every write follows the same loop: load the aggregate, apply a domain
//! operation, then `replace_*` with the version that was read. A version
//! conflict means someone else wrote first, so the loop reloads and
//! re-applies the operation against fresh state. Domain rule violations end
//! the loop immediately.

pub mod groups;
pub mod preferences;
pub mod recommendations;
pub mod users;
pub mod voting;

pub use groups::{GroupService, GroupStats};
pub use preferences::{MemberPreferences, PreferenceService};
pub use recommendations::RecommendationEngine;
pub use users::UserService;
pub use voting::{SessionResults, VotingService};

use domain::DomainError;
use store::StoreError;
use tracing::{debug, error};

/// Upper bound on reload-and-retry rounds for one write.
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

/// `Ok(Some(saved))` on success, `Ok(None)` on a version conflict.
pub(crate) fn committed<T>(result: store::Result<T>) -> domain::Result<Option<T>> {
    match result {
        Ok(saved) => Ok(Some(saved)),
        Err(e) if e.is_conflict() => {
            debug!(error = %e, "write lost a version race, retrying");
            Ok(None)
        }
        Err(e) => Err(storage_failure(e)),
    }
}

/// Convert a store error, logging the details of anything internal.
pub(crate) fn storage_failure(err: StoreError) -> DomainError {
    let mapped = DomainError::from(err.clone());
    if mapped.kind() == domain::ErrorKind::Internal {
        error!(error = %err, "storage failure");
    }
    mapped
}

pub(crate) fn contention(entity: &str, id: impl std::fmt::Display) -> DomainError {
    error!(entity, %id, attempts = MAX_UPDATE_ATTEMPTS, "gave up after repeated write conflicts");
    DomainError::Internal(format!("too many concurrent updates to {} {}", entity, id))
}
