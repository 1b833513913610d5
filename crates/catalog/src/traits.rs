use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Genre, GenreId, Movie, MovieId};

/// Read-only access to movie metadata.
///
/// Pages start at 1. Implementations must be safe to call concurrently.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>>;

    async fn by_genre(&self, genre_id: GenreId, page: u32) -> Result<Vec<Movie>>;

    async fn by_id(&self, id: MovieId) -> Result<Movie>;

    async fn genres(&self) -> Result<Vec<Genre>>;

    async fn popular(&self, page: u32) -> Result<Vec<Movie>>;
}
