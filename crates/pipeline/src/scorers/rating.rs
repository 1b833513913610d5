use catalog::Movie;

use crate::traits::{Contribution, Scorer, ScoringContext};

/// Linear in the catalog rating.
pub struct RatingScorer {
    weight: f32,
    high_rating_threshold: f32,
}

impl RatingScorer {
    pub fn new(weight: f32, high_rating_threshold: f32) -> Self {
        Self {
            weight,
            high_rating_threshold,
        }
    }
}

impl Scorer for RatingScorer {
    fn name(&self) -> &str {
        "RatingScorer"
    }

    fn score(&self, movie: &Movie, _context: &ScoringContext<'_>) -> Contribution {
        let rating = movie.vote_average.clamp(0.0, 10.0);
        let points = self.weight * rating;
        if rating >= self.high_rating_threshold {
            Contribution::with_reason(points, format!("Highly rated ({:.1}/10)", rating))
        } else {
            Contribution::silent(points)
        }
    }
}
