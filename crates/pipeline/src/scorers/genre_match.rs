use catalog::Movie;

use crate::traits::{Contribution, Scorer, ScoringContext};

/// Rewards movies in the group's common (majority) genres.
pub struct GenreMatchScorer {
    weight: f32,
}

impl GenreMatchScorer {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Scorer for GenreMatchScorer {
    fn name(&self) -> &str {
        "GenreMatchScorer"
    }

    fn score(&self, movie: &Movie, context: &ScoringContext<'_>) -> Contribution {
        let mut matched_weight = 0u32;
        let mut matched_names = Vec::new();
        for genre in &movie.genres {
            if let Some(weight) = context.preferences.common_weight(genre.id) {
                matched_weight += weight;
                matched_names.push(genre.name.as_str());
            }
        }

        if matched_names.is_empty() {
            return Contribution::none();
        }
        Contribution::with_reason(
            self.weight * matched_weight as f32,
            format!("Matches group favorites: {}", matched_names.join(", ")),
        )
    }
}
