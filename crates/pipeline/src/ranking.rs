//! Deduplication and final ordering of scored movies.

use domain::MovieId;
use std::collections::HashMap;

use crate::scoring_pipeline::ScoredMovie;

/// Deduplicate by movie id, keeping the highest score seen.
///
/// Movies fetched under several genres show up more than once.
pub fn merge_candidates(scored: Vec<ScoredMovie>) -> Vec<ScoredMovie> {
    let mut best: HashMap<MovieId, ScoredMovie> = HashMap::with_capacity(scored.len());
    for candidate in scored {
        best.entry(candidate.movie.id)
            .and_modify(|existing| {
                if candidate.score > existing.score {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }
    best.into_values().collect()
}

/// Deduplicate, sort by score descending (movie id ascending on ties) and
/// keep the first `limit`.
pub fn rank(scored: Vec<ScoredMovie>, limit: usize) -> Vec<ScoredMovie> {
    let mut ranked = merge_candidates(scored);
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.movie.id.cmp(&b.movie.id))
    });
    ranked.truncate(limit);
    ranked
}
