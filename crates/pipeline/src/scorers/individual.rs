use catalog::Movie;

use crate::traits::{Contribution, Scorer, ScoringContext};

/// Sums every member's weight for the movie's genres.
pub struct IndividualPreferenceScorer {
    weight: f32,
}

impl IndividualPreferenceScorer {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Scorer for IndividualPreferenceScorer {
    fn name(&self) -> &str {
        "IndividualPreferenceScorer"
    }

    fn score(&self, movie: &Movie, context: &ScoringContext<'_>) -> Contribution {
        let mut total = 0u32;
        let mut fans = 0usize;
        for prefs in context.preferences.individual_preferences.values() {
            let member_total: u32 = prefs
                .iter()
                .filter(|p| movie.has_genre(p.genre_id))
                .map(|p| u32::from(p.weight))
                .sum();
            if member_total > 0 {
                fans += 1;
                total += member_total;
            }
        }

        match fans {
            0 => Contribution::none(),
            1 => Contribution::with_reason(self.weight * total as f32, "Fits one member's taste"),
            n => Contribution::with_reason(
                self.weight * total as f32,
                format!("Fits the taste of {} members", n),
            ),
        }
    }
}
