//! The ScoringPipeline sums the contributions of a chain of scorers.

use catalog::Movie;
use domain::MovieCandidate;
use rayon::prelude::*;
use tracing::debug;

use crate::scorers::{
    GenreMatchScorer, IndividualPreferenceScorer, PopularityScorer, RatingScorer, RecencyScorer,
    ScoringWeights,
};
use crate::traits::{Scorer, ScoringContext};

/// Scores are clamped into `[0, MAX_SCORE]` so they stay comparable across calls.
pub const MAX_SCORE: f32 = 100.0;

/// Reasons kept per candidate, strongest first.
const MAX_REASONS: usize = 2;

const DEFAULT_REASON: &str = "Recommended for your group";

/// A movie with its total score and the reasons behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMovie {
    pub movie: Movie,
    pub score: f32,
    pub reasons: Vec<String>,
}

impl ScoredMovie {
    pub fn reason(&self) -> String {
        if self.reasons.is_empty() {
            DEFAULT_REASON.to_string()
        } else {
            self.reasons.join("; ")
        }
    }

    /// Snapshot form stored on a voting session.
    pub fn into_candidate(self) -> MovieCandidate {
        let reason = self.reason();
        MovieCandidate {
            movie_id: self.movie.id,
            year: self.movie.year(),
            genres: self.movie.genre_names(),
            title: self.movie.title,
            poster_url: self.movie.poster_url,
            rating: self.movie.vote_average,
            score: self.score,
            reason,
        }
    }
}

/// Chains multiple scorers together.
///
/// ## Usage
/// ```ignore
/// let pipeline = ScoringPipeline::new()
///     .add_scorer(RatingScorer::new(3.0, 7.5))
///     .add_scorer(GenreMatchScorer::new(2.0));
///
/// let scored = pipeline.score_all(movies, &context);
/// ```
pub struct ScoringPipeline {
    scorers: Vec<Box<dyn Scorer>>,
}

impl ScoringPipeline {
    pub fn new() -> Self {
        Self {
            scorers: Vec::new(),
        }
    }

    /// Pipeline with every built-in scorer using `weights`.
    pub fn from_weights(weights: &ScoringWeights) -> Self {
        Self::new()
            .add_scorer(RatingScorer::new(weights.rating, weights.high_rating_threshold))
            .add_scorer(GenreMatchScorer::new(weights.genre_preference))
            .add_scorer(PopularityScorer::new(
                weights.popularity_bonus,
                weights.popularity_threshold,
            ))
            .add_scorer(RecencyScorer::new(weights.recency_bonus, weights.recency_years))
            .add_scorer(IndividualPreferenceScorer::new(weights.individual_preference))
    }

    /// Add a scorer to the pipeline (builder pattern).
    pub fn add_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorers.push(Box::new(scorer));
        self
    }

    pub fn scorer_names(&self) -> Vec<&str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    /// Score one movie.
    ///
    /// ## Algorithm
    /// 1. Ask every scorer for its contribution
    /// 2. Sum the points and clamp to `[0, MAX_SCORE]`
    /// 3. Keep the reasons of the largest contributions (ties in scorer order)
    pub fn score(&self, movie: &Movie, context: &ScoringContext<'_>) -> ScoredMovie {
        let mut total = 0.0f32;
        let mut reasons: Vec<(f32, String)> = Vec::new();

        for scorer in &self.scorers {
            let contribution = scorer.score(movie, context);
            total += contribution.points;
            if let Some(reason) = contribution.reason {
                reasons.push((contribution.points, reason));
            }
        }

        // Stable sort keeps scorer order among equal contributions
        reasons.sort_by(|a, b| b.0.total_cmp(&a.0));

        ScoredMovie {
            movie: movie.clone(),
            score: total.clamp(0.0, MAX_SCORE),
            reasons: reasons
                .into_iter()
                .take(MAX_REASONS)
                .map(|(_, reason)| reason)
                .collect(),
        }
    }

    /// Score every movie in parallel. Output order matches input order.
    pub fn score_all(&self, movies: &[Movie], context: &ScoringContext<'_>) -> Vec<ScoredMovie> {
        let scored: Vec<ScoredMovie> = movies
            .par_iter()
            .map(|movie| self.score(movie, context))
            .collect();
        debug!(
            "Scored {} movies with {} scorers",
            scored.len(),
            self.scorers.len()
        );
        scored
    }
}

impl Default for ScoringPipeline {
    fn default() -> Self {
        Self::from_weights(&ScoringWeights::default())
    }
}
