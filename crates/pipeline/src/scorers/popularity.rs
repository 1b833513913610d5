use catalog::Movie;

use crate::traits::{Contribution, Scorer, ScoringContext};

/// Flat bonus once a movie has enough catalog votes.
pub struct PopularityScorer {
    bonus: f32,
    min_votes: u32,
}

impl PopularityScorer {
    pub fn new(bonus: f32, min_votes: u32) -> Self {
        Self { bonus, min_votes }
    }
}

impl Scorer for PopularityScorer {
    fn name(&self) -> &str {
        "PopularityScorer"
    }

    fn score(&self, movie: &Movie, _context: &ScoringContext<'_>) -> Contribution {
        if movie.vote_count >= self.min_votes {
            Contribution::with_reason(self.bonus, "Popular pick")
        } else {
            Contribution::none()
        }
    }
}
