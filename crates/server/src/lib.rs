//! Application layer for the movie night backend.
//!
//! This crate wires the domain, store, catalog, pipeline and fanout crates
//! into services:
//! - **UserService**: first-login registration, profiles, global preferences
//! - **GroupService**: membership, invitation codes, soft deletion
//! - **PreferenceService**: per-group member preferences and aggregation
//! - **RecommendationEngine**: catalog fetch, scoring and ranking
//! - **VotingService**: session lifecycle, votes and results
//!
//! [`App`] builds all of them from an [`AppConfig`].

pub mod app;
pub mod config;
pub mod logging;
pub mod services;
pub mod sweeper;

pub use app::{App, build_catalog};
pub use config::{AppConfig, CatalogProvider, ConfigError};
pub use services::{
    GroupService, GroupStats, MemberPreferences, PreferenceService, RecommendationEngine, SessionResults,
    UserService, VotingService,
};
pub use sweeper::spawn_expiry_sweeper;
