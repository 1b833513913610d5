//! # Domain Crate
//!
//! Core types and rules for group movie nights: users, groups with
//! invitation codes, genre preferences and voting sessions.
//!
//! ## Main Components
//!
//! - **types**: Entities and value types (User, Group, Member, VotingSession, Vote)
//! - **group**: Membership rules and invitation code generation
//! - **preferences**: Genre preference validation
//! - **session**: Voting state machine, tallying and winner selection
//! - **user**: Profile and global preference updates
//! - **error**: Domain error type and its client-facing classification
//!
//! ## Example Usage
//!
//! ```ignore
//! use domain::{Group, VotingSession, SessionSettings, VoteValue};
//!
//! let group = Group::new("Friday Films", None, "alice", now)?;
//! let mut session = VotingSession::new(group.id, "alice", candidates, SessionSettings::default(), now);
//! session.start("alice", now)?;
//! session.cast_vote("alice", 550, VoteValue::Yes, now)?;
//! session.complete("alice", now)?;
//! println!("Winner: {:?}", session.winner());
//! ```
//!
//! Nothing in this crate performs I/O. Persistence and concurrency control
//! live in the `store` crate; orchestration lives in `server`.

pub mod error;
pub mod group;
pub mod preferences;
pub mod session;
pub mod types;
pub mod user;

pub use error::{DomainError, ErrorKind, Result};
pub use group::{generate_invitation_code, normalize_invitation_code};
pub use preferences::{normalize_preferences, validate_preferences};
pub use session::{select_winner, tally_votes};
pub use user::{validate_display_name, validate_email};
pub use types::{
    // Type aliases
    GenreId,
    GroupId,
    MovieId,
    SessionId,
    UserId,
    // Entities
    GenrePreference,
    Group,
    Member,
    User,
    Vote,
    VotingSession,
    // Values
    MovieCandidate,
    MovieResult,
    SessionSettings,
    SessionStatus,
    VoteValue,
    VotingStats,
};
