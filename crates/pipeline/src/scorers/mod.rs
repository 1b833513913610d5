//! Scorer implementations for the scoring pipeline.

pub mod genre_match;
pub mod individual;
pub mod popularity;
pub mod rating;
pub mod recency;

pub use genre_match::GenreMatchScorer;
pub use individual::IndividualPreferenceScorer;
pub use popularity::PopularityScorer;
pub use rating::RatingScorer;
pub use recency::RecencyScorer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid scoring weight {field}: {value}")]
pub struct WeightsError {
    pub field: &'static str,
    pub value: f32,
}

/// Coefficients for the default scorers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Multiplier on the catalog rating (0-10)
    pub rating: f32,
    /// Rating at which a "highly rated" reason is attached
    pub high_rating_threshold: f32,
    /// Multiplier on matched common-genre weights
    pub genre_preference: f32,
    pub popularity_bonus: f32,
    /// Vote count needed for the popularity bonus
    pub popularity_threshold: u32,
    pub recency_bonus: f32,
    /// Releases within this many years of the reference date are recent
    pub recency_years: u32,
    /// Multiplier on each member's matching genre weights
    pub individual_preference: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating: 3.0,
            high_rating_threshold: 7.5,
            genre_preference: 2.0,
            popularity_bonus: 5.0,
            popularity_threshold: 1000,
            recency_bonus: 5.0,
            recency_years: 2,
            individual_preference: 0.5,
        }
    }
}

impl ScoringWeights {
    /// Negative coefficients would make scores decrease as movies improve.
    pub fn validate(&self) -> Result<(), WeightsError> {
        let coefficients = [
            ("rating", self.rating),
            ("genre_preference", self.genre_preference),
            ("popularity_bonus", self.popularity_bonus),
            ("recency_bonus", self.recency_bonus),
            ("individual_preference", self.individual_preference),
        ];
        for (field, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError { field, value });
            }
        }
        Ok(())
    }
}
