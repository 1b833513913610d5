//! Group preference aggregation and movie scoring.
//!
//! This crate provides:
//! - Preference aggregation for a group (ranked and common genres)
//! - Scorer trait and implementations for candidate scoring
//! - ScoringPipeline for composing scorers
//! - Ranking: deduplication, deterministic ordering and truncation
//!
//! ## Architecture
//! Recommendations are built in stages:
//! 1. Member preferences are aggregated into group-level genre weights
//! 2. Catalog movies for the top genres are scored by the pipeline
//! 3. Scored movies are deduplicated, ranked and cut to the requested size
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{aggregate_preferences, rank, ScoringContext, ScoringPipeline};
//!
//! let prefs = aggregate_preferences(group.id, &group.members);
//! let context = ScoringContext::new(&prefs, today);
//! let scored = ScoringPipeline::default().score_all(&movies, &context);
//! let top = rank(scored, 10);
//! ```

pub mod aggregate;
pub mod ranking;
pub mod scorers;
pub mod scoring_pipeline;
pub mod traits;

// Re-export main types
pub use aggregate::{
    GenreStat, GenreStats, GroupPreferences, WeightedGenre, aggregate_preferences, genre_stats,
};
pub use ranking::{merge_candidates, rank};
pub use scorers::{ScoringWeights, WeightsError};
pub use scoring_pipeline::{MAX_SCORE, ScoredMovie, ScoringPipeline};
pub use traits::{Contribution, Scorer, ScoringContext};
