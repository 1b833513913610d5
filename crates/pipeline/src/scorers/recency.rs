//! Bonus for recent releases.
//!
//! A movie released on or after `reference_date - years` gets the bonus,
//! including announced releases dated after the reference date.

use catalog::Movie;
use chrono::Months;

use crate::traits::{Contribution, Scorer, ScoringContext};

pub struct RecencyScorer {
    bonus: f32,
    years: u32,
}

impl RecencyScorer {
    pub fn new(bonus: f32, years: u32) -> Self {
        Self { bonus, years }
    }
}

impl Scorer for RecencyScorer {
    fn name(&self) -> &str {
        "RecencyScorer"
    }

    fn score(&self, movie: &Movie, context: &ScoringContext<'_>) -> Contribution {
        let Some(released) = movie.release_date else {
            return Contribution::none();
        };
        let cutoff = context
            .reference_date
            .checked_sub_months(Months::new(self.years.saturating_mul(12)));

        match cutoff {
            Some(cutoff) if released >= cutoff => {
                Contribution::with_reason(self.bonus, "Recent release")
            }
            _ => Contribution::none(),
        }
    }
}
