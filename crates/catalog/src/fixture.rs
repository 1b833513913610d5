//! Catalog served from a JSON document held in memory.
//!
//! The document has the shape `{"genres": [...], "movies": [...]}` using the
//! same field names as [`Movie`]. Lists are ordered by vote count descending,
//! then id, and paged 20 at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::traits::MovieCatalog;
use crate::types::{Genre, GenreId, Movie, MovieId};

pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    genres: Vec<Genre>,
    /// Movies in popularity order
    movies: Vec<Movie>,
    by_id: HashMap<MovieId, usize>,
    /// Genre id -> positions in `movies`
    genre_index: HashMap<GenreId, Vec<usize>>,
}

impl FixtureCatalog {
    pub fn new(fixture: CatalogFixture) -> Self {
        let CatalogFixture { mut genres, mut movies } = fixture;
        genres.sort_by_key(|g| g.id);
        movies.sort_by_key(|m| m.id);
        movies.dedup_by_key(|m| m.id);
        movies.sort_by(|a, b| b.vote_count.cmp(&a.vote_count).then(a.id.cmp(&b.id)));

        let mut by_id = HashMap::new();
        let mut genre_index: HashMap<GenreId, Vec<usize>> = HashMap::new();
        for (pos, movie) in movies.iter().enumerate() {
            by_id.insert(movie.id, pos);
            for genre in &movie.genres {
                genre_index.entry(genre.id).or_default().push(pos);
            }
        }

        Self {
            genres,
            movies,
            by_id,
            genre_index,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: CatalogFixture =
            serde_json::from_str(json).map_err(|e| CatalogError::Fixture(e.to_string()))?;
        Ok(Self::new(fixture))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Fixture(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&json)?;
        info!(
            "Loaded fixture catalog from {} ({} movies, {} genres)",
            path.display(),
            catalog.movies.len(),
            catalog.genres.len()
        );
        Ok(catalog)
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    fn page_of<'a>(&self, items: impl Iterator<Item = &'a Movie>, page: u32) -> Vec<Movie> {
        let skip = (page.max(1) as usize - 1) * PAGE_SIZE;
        items.skip(skip).take(PAGE_SIZE).cloned().collect()
    }
}

#[async_trait]
impl MovieCatalog for FixtureCatalog {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.page_of(
            self.movies
                .iter()
                .filter(|m| m.title.to_lowercase().contains(&needle)),
            page,
        ))
    }

    async fn by_genre(&self, genre_id: GenreId, page: u32) -> Result<Vec<Movie>> {
        let positions = self.genre_index.get(&genre_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(self.page_of(positions.iter().map(|&pos| &self.movies[pos]), page))
    }

    async fn by_id(&self, id: MovieId) -> Result<Movie> {
        self.by_id
            .get(&id)
            .map(|&pos| self.movies[pos].clone())
            .ok_or_else(|| CatalogError::NotFound(format!("movie {}", id)))
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.genres.clone())
    }

    async fn popular(&self, page: u32) -> Result<Vec<Movie>> {
        Ok(self.page_of(self.movies.iter(), page))
    }
}
