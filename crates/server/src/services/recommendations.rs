//! # Recommendation Engine
//!
//! Turns a group's preferences into a ranked list of movie candidates:
//! 1. Aggregate member preferences
//! 2. Fetch catalog movies for the top genres concurrently
//! 3. Score every movie with the scoring pipeline
//! 4. Deduplicate, rank and truncate
//!
//! ## Design Note
//! Scoring is CPU-bound and runs on the blocking pool via `spawn_blocking`
//! so catalog I/O for other requests keeps making progress.

use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use catalog::{Movie, MovieCatalog};
use domain::{DomainError, Group, MovieCandidate};
use pipeline::{ScoringContext, ScoringPipeline, aggregate_preferences, rank};

pub const MIN_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

/// Genres queried per request; bounds catalog calls.
pub const DEFAULT_TOP_GENRES: usize = 5;

#[derive(Clone)]
pub struct RecommendationEngine {
    catalog: Arc<dyn MovieCatalog>,
    pipeline: Arc<ScoringPipeline>,
    top_genres: usize,
    pages_per_genre: u32,
    reference_date: Option<NaiveDate>,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn MovieCatalog>, pipeline: ScoringPipeline) -> Self {
        Self {
            catalog,
            pipeline: Arc::new(pipeline),
            top_genres: DEFAULT_TOP_GENRES,
            pages_per_genre: 1,
            reference_date: None,
        }
    }

    pub fn with_top_genres(mut self, top_genres: usize) -> Self {
        self.top_genres = top_genres.max(1);
        self
    }

    pub fn with_pages_per_genre(mut self, pages: u32) -> Self {
        self.pages_per_genre = pages.max(1);
        self
    }

    /// Pin "today" for recency scoring. Defaults to the current UTC date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn catalog(&self) -> &Arc<dyn MovieCatalog> {
        &self.catalog
    }

    /// Ranked candidates for `group`, at most `limit` of them.
    ///
    /// # Errors
    /// - `Validation` when `limit` is outside `MIN_LIMIT..=MAX_LIMIT`
    /// - `InsufficientData` when no member has preferences
    /// - `CatalogUnavailable` when any genre fetch fails
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    pub async fn recommend(&self, group: &Group, limit: usize) -> domain::Result<Vec<MovieCandidate>> {
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(DomainError::Validation(format!(
                "limit must be between {} and {}, got {}",
                MIN_LIMIT, MAX_LIMIT, limit
            )));
        }
        let start_time = Instant::now();

        let preferences = aggregate_preferences(group.id, &group.members);
        if preferences.is_empty() {
            return Err(DomainError::InsufficientData(group.id));
        }

        let genre_ids: Vec<u32> = preferences
            .top_genres(self.top_genres)
            .iter()
            .map(|g| g.genre_id)
            .collect();
        let movies = self.fetch_candidates(&genre_ids).await?;
        debug!("Fetched {} catalog movies", movies.len());

        let reference_date = self.reference_date.unwrap_or_else(|| Utc::now().date_naive());
        let pipeline = self.pipeline.clone();
        let ranked = tokio::task::spawn_blocking(move || {
            let context = ScoringContext::new(&preferences, reference_date);
            rank(pipeline.score_all(&movies, &context), limit)
        })
        .await
        .map_err(|e| {
            error!(error = %e, "scoring task failed");
            DomainError::Internal(format!("scoring task failed: {}", e))
        })?;

        let candidates: Vec<MovieCandidate> = ranked.into_iter().map(|s| s.into_candidate()).collect();
        info!(
            count = candidates.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "recommendations generated"
        );
        Ok(candidates)
    }

    /// Every page of every genre, fetched concurrently. One failure fails
    /// the whole request rather than returning a partial list.
    async fn fetch_candidates(&self, genre_ids: &[u32]) -> domain::Result<Vec<Movie>> {
        let requests = genre_ids.iter().flat_map(|&genre_id| {
            (1..=self.pages_per_genre).map(move |page| self.catalog.by_genre(genre_id, page))
        });
        let pages = try_join_all(requests).await.map_err(|e| {
            error!(catalog = self.catalog.name(), error = %e, "catalog fetch failed");
            DomainError::from(e)
        })?;
        Ok(pages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use catalog::{CatalogError, CatalogFixture, FixtureCatalog, Genre};
    use domain::{GenrePreference, Member};

    const COMEDY: u32 = 35;
    const DRAMA: u32 = 18;

    fn movie(id: u32, genre: (u32, &str), rating: f32, votes: u32) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            overview: String::new(),
            poster_url: None,
            release_date: NaiveDate::from_ymd_opt(2015, 1, 1),
            genres: vec![Genre::new(genre.0, genre.1)],
            vote_average: rating,
            vote_count: votes,
            runtime: None,
        }
    }

    fn engine() -> RecommendationEngine {
        let fixture = CatalogFixture {
            genres: vec![Genre::new(COMEDY, "Comedy"), Genre::new(DRAMA, "Drama")],
            movies: (1..=8)
                .map(|id| movie(id, (COMEDY, "Comedy"), 5.0 + id as f32 * 0.5, 100 * id))
                .chain((9..=12).map(|id| movie(id, (DRAMA, "Drama"), 7.0, 500)))
                .collect(),
        };
        RecommendationEngine::new(Arc::new(FixtureCatalog::new(fixture)), ScoringPipeline::default())
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn group(prefs: &[(&str, u32, &str, u8)]) -> Group {
        let mut group = Group::new("Film Club", None, "owner", Utc::now()).unwrap();
        for (user, genre_id, name, weight) in prefs {
            let member = Member::new(*user, Utc::now())
                .with_preferences(vec![GenrePreference::new(*genre_id, *name, *weight)]);
            if *user == "owner" {
                group.members[0] = member;
            } else {
                group.members.push(member);
            }
        }
        group
    }

    #[tokio::test]
    async fn test_recommend_ranks_and_truncates() {
        let group = group(&[("owner", COMEDY, "Comedy", 8), ("ann", COMEDY, "Comedy", 6)]);
        let candidates = engine().recommend(&group, 5).await.unwrap();

        assert_eq!(candidates.len(), 5);
        // Best rated comedy first
        assert_eq!(candidates[0].movie_id, 8);
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(candidates.iter().all(|c| c.genres == vec!["Comedy".to_string()]));
    }

    #[tokio::test]
    async fn test_recommend_is_deterministic() {
        let group = group(&[("owner", COMEDY, "Comedy", 8), ("ann", DRAMA, "Drama", 9)]);
        let engine = engine();
        let first = engine.recommend(&group, 10).await.unwrap();
        let second = engine.recommend(&group, 10).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recommend_requires_preferences() {
        let group = group(&[]);
        assert_matches!(
            engine().recommend(&group, 10).await,
            Err(DomainError::InsufficientData(_))
        );
    }

    #[tokio::test]
    async fn test_limit_bounds() {
        let group = group(&[("owner", COMEDY, "Comedy", 8)]);
        assert_matches!(engine().recommend(&group, 4).await, Err(DomainError::Validation(_)));
        assert_matches!(engine().recommend(&group, 51).await, Err(DomainError::Validation(_)));
    }

    struct DownCatalog;

    #[async_trait]
    impl MovieCatalog for DownCatalog {
        fn name(&self) -> &'static str {
            "down"
        }
        async fn search(&self, _query: &str, _page: u32) -> catalog::Result<Vec<Movie>> {
            Err(CatalogError::Timeout)
        }
        async fn by_genre(&self, _genre_id: u32, _page: u32) -> catalog::Result<Vec<Movie>> {
            Err(CatalogError::Timeout)
        }
        async fn by_id(&self, id: u32) -> catalog::Result<Movie> {
            Err(CatalogError::NotFound(format!("movie {}", id)))
        }
        async fn genres(&self) -> catalog::Result<Vec<Genre>> {
            Err(CatalogError::Timeout)
        }
        async fn popular(&self, _page: u32) -> catalog::Result<Vec<Movie>> {
            Err(CatalogError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_catalog_outage_is_reported() {
        let engine = RecommendationEngine::new(Arc::new(DownCatalog), ScoringPipeline::default());
        let group = group(&[("owner", COMEDY, "Comedy", 8)]);
        assert_matches!(
            engine.recommend(&group, 10).await,
            Err(DomainError::CatalogUnavailable(_))
        );
    }
}
