//! # Catalog Crate
//!
//! Movie metadata lookups behind the [`MovieCatalog`] trait.
//!
//! ## Components
//!
//! - **TmdbCatalog**: HTTP client for the TMDB v3 API
//! - **FixtureCatalog**: JSON document served from memory (CLI, tests)
//! - **RetryingCatalog**: retries rate-limited, timed-out and unavailable reads
//! - **CachedCatalog**: TTL cache in front of any catalog
//!
//! Decorators wrap an `Arc<dyn MovieCatalog>` and can be stacked:
//!
//! ```ignore
//! let tmdb: Arc<dyn MovieCatalog> = Arc::new(TmdbCatalog::new(TmdbConfig::new(key))?);
//! let retrying: Arc<dyn MovieCatalog> = Arc::new(RetryingCatalog::new(tmdb, RetryPolicy::default()));
//! let catalog = CachedCatalog::new(retrying, Duration::from_secs(300));
//! let comedies = catalog.by_genre(35, 1).await?;
//! ```

pub mod cache;
pub mod error;
pub mod fixture;
pub mod retry;
pub mod tmdb;
pub mod traits;
pub mod types;

pub use cache::CachedCatalog;
pub use error::{CatalogError, Result};
pub use fixture::{CatalogFixture, FixtureCatalog};
pub use retry::{RetryPolicy, RetryingCatalog, with_retry};
pub use tmdb::{TmdbCatalog, TmdbConfig};
pub use traits::MovieCatalog;
pub use types::{Genre, GenreId, Movie, MovieId};
