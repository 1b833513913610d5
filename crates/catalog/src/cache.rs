//! TTL cache decorator.
//!
//! Caches the genre list, genre and popular pages, and per-id lookups.
//! Search results are passed through. Errors are never cached.

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::traits::MovieCatalog;
use crate::types::{Genre, GenreId, Movie, MovieId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ListKey {
    Genre(GenreId, u32),
    Popular(u32),
}

struct Entry<V> {
    stored_at: Instant,
    value: V,
}

struct TtlMap<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlMap<K, V> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    async fn put(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }
}

pub struct CachedCatalog {
    inner: Arc<dyn MovieCatalog>,
    genres: TtlMap<(), Vec<Genre>>,
    lists: TtlMap<ListKey, Vec<Movie>>,
    movies: TtlMap<MovieId, Movie>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn MovieCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            genres: TtlMap::new(ttl),
            lists: TtlMap::new(ttl),
            movies: TtlMap::new(ttl),
        }
    }

    async fn cached_list<F>(&self, key: ListKey, fetch: F) -> Result<Vec<Movie>>
    where
        F: std::future::Future<Output = Result<Vec<Movie>>>,
    {
        if let Some(hit) = self.lists.get(&key).await {
            debug!(?key, "catalog cache hit");
            return Ok(hit);
        }
        let movies = fetch.await?;
        self.lists.put(key, movies.clone()).await;
        Ok(movies)
    }
}

#[async_trait]
impl MovieCatalog for CachedCatalog {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>> {
        self.inner.search(query, page).await
    }

    async fn by_genre(&self, genre_id: GenreId, page: u32) -> Result<Vec<Movie>> {
        self.cached_list(ListKey::Genre(genre_id, page), self.inner.by_genre(genre_id, page))
            .await
    }

    async fn by_id(&self, id: MovieId) -> Result<Movie> {
        if let Some(hit) = self.movies.get(&id).await {
            return Ok(hit);
        }
        let movie = self.inner.by_id(id).await?;
        self.movies.put(id, movie.clone()).await;
        Ok(movie)
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        if let Some(hit) = self.genres.get(&()).await {
            return Ok(hit);
        }
        let genres = self.inner.genres().await?;
        self.genres.put((), genres.clone()).await;
        Ok(genres)
    }

    async fn popular(&self, page: u32) -> Result<Vec<Movie>> {
        self.cached_list(ListKey::Popular(page), self.inner.popular(page))
            .await
    }
}
