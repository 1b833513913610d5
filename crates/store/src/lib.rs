//! # Store Crate
//!
//! Persistence ports for users, groups and voting sessions, plus an
//! in-memory implementation.
//!
//! ## Concurrency
//!
//! Writes are compare-and-swap on the aggregate `version`. A stale write
//! fails with [`StoreError::VersionConflict`] and the caller reloads and
//! retries. The store itself enforces that a group has at most one open
//! (pending or active) session, including under concurrent inserts.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use traits::{GroupStore, SessionStore, Store, UserStore};
