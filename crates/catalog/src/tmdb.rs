//! HTTP client for The Movie Database (TMDB) v3 API.
//!
//! List endpoints only carry genre ids, so the genre list is fetched once on
//! first use and reused to resolve names.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::traits::MovieCatalog;
use crate::types::{Genre, GenreId, Movie, MovieId, parse_release_date};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub base_url: String,
    pub api_key: String,
    pub image_base_url: String,
    pub timeout: Duration,
}

impl TmdbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct TmdbCatalog {
    client: Client,
    config: TmdbConfig,
    genres: OnceCell<HashMap<GenreId, String>>,
}

impl TmdbCatalog {
    pub fn new(config: TmdbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            genres: OnceCell::new(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let response = check_status(response, path).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode(format!("{}: {}", path, e)))
    }

    async fn genre_names(&self) -> Result<&HashMap<GenreId, String>> {
        self.genres
            .get_or_try_init(|| async {
                let list: GenreList = self.get_json("/genre/movie/list", &[]).await?;
                Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
            })
            .await
    }

    async fn list(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Movie>> {
        let page: MoviePage = self.get_json(path, query).await?;
        let names = self.genre_names().await?;
        Ok(page
            .results
            .into_iter()
            .map(|m| m.into_movie(names, &self.config.image_base_url))
            .collect())
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => CatalogError::Unauthorized,
        StatusCode::NOT_FOUND => CatalogError::NotFound(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited {
            retry_after: response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        s if s.is_server_error() => CatalogError::Unavailable(format!("{} returned {}", path, s)),
        s => CatalogError::Transport(format!("{} returned unexpected status {}", path, s)),
    };
    warn!(status = status.as_u16(), path, "catalog request failed");
    Err(err)
}

#[async_trait]
impl MovieCatalog for TmdbCatalog {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.list(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.max(1).to_string())],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn by_genre(&self, genre_id: GenreId, page: u32) -> Result<Vec<Movie>> {
        self.list(
            "/discover/movie",
            &[
                ("with_genres", genre_id.to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.max(1).to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn by_id(&self, id: MovieId) -> Result<Movie> {
        let details: MovieDetails = self.get_json(&format!("/movie/{}", id), &[]).await?;
        Ok(details.into_movie(&self.config.image_base_url))
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        let names = self.genre_names().await?;
        let mut genres: Vec<Genre> = names
            .iter()
            .map(|(id, name)| Genre::new(*id, name.clone()))
            .collect();
        genres.sort_by_key(|g| g.id);
        Ok(genres)
    }

    #[instrument(skip(self))]
    async fn popular(&self, page: u32) -> Result<Vec<Movie>> {
        self.list("/movie/popular", &[("page", page.max(1).to_string())])
            .await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct MoviePage {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

#[derive(Debug, Deserialize)]
struct MovieSummary {
    id: MovieId,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<GenreId>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: u32,
}

impl MovieSummary {
    fn into_movie(self, names: &HashMap<GenreId, String>, image_base: &str) -> Movie {
        let genres = self
            .genre_ids
            .into_iter()
            .map(|id| {
                let name = names.get(&id).cloned().unwrap_or_else(|| "Unknown".to_string());
                Genre::new(id, name)
            })
            .collect();

        Movie {
            id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default(),
            poster_url: poster_url(image_base, self.poster_path.as_deref()),
            release_date: parse_release_date(self.release_date.as_deref()),
            genres,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            runtime: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    id: MovieId,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    runtime: Option<u32>,
}

impl MovieDetails {
    fn into_movie(self, image_base: &str) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default(),
            poster_url: poster_url(image_base, self.poster_path.as_deref()),
            release_date: parse_release_date(self.release_date.as_deref()),
            genres: self.genres,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            runtime: self.runtime.filter(|r| *r > 0),
        }
    }
}

fn poster_url(image_base: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", image_base, p))
}
