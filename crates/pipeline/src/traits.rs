//! Core traits for the scoring pipeline.

use catalog::Movie;
use chrono::NaiveDate;

use crate::aggregate::GroupPreferences;

/// Everything a scorer may look at besides the movie itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub preferences: &'a GroupPreferences,
    /// "Today" for recency decisions; injected so scores are reproducible
    pub reference_date: NaiveDate,
}

impl<'a> ScoringContext<'a> {
    pub fn new(preferences: &'a GroupPreferences, reference_date: NaiveDate) -> Self {
        Self {
            preferences,
            reference_date,
        }
    }
}

/// Points one scorer adds to a movie, with an optional human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub points: f32,
    pub reason: Option<String>,
}

impl Contribution {
    pub fn none() -> Self {
        Self {
            points: 0.0,
            reason: None,
        }
    }

    pub fn silent(points: f32) -> Self {
        Self {
            points,
            reason: None,
        }
    }

    pub fn with_reason(points: f32, reason: impl Into<String>) -> Self {
        Self {
            points,
            reason: Some(reason.into()),
        }
    }
}

/// Core trait for scoring candidates.
///
/// ## Design Note
/// - `Send + Sync` so the pipeline can score candidates in parallel
/// - Scorers must be pure: the same movie and context always yield the same
///   contribution
/// - Contributions must never decrease when the movie gets strictly better
///   on the dimension the scorer looks at
pub trait Scorer: Send + Sync {
    /// Returns the name of this scorer (for logging/debugging)
    fn name(&self) -> &str;

    fn score(&self, movie: &Movie, context: &ScoringContext<'_>) -> Contribution;
}
