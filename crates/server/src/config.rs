//! Application configuration.
//!
//! Loaded in order, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `movie-night.toml` (or an explicit path, which must then exist)
//! 3. Environment variables prefixed `MOVIE_NIGHT__`, with `__` between
//!    nested keys, e.g. `MOVIE_NIGHT__CATALOG__API_KEY=...`
//!
//! A `.env` file is read first if present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use pipeline::ScoringWeights;

pub const DEFAULT_CONFIG_FILE: &str = "movie-night.toml";
pub const ENV_PREFIX: &str = "MOVIE_NIGHT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub catalog: CatalogConfig,
    pub recommendations: RecommendationConfig,
    pub groups: GroupConfig,
    pub sessions: SessionConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogProvider {
    #[default]
    Fixture,
    Tmdb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub provider: CatalogProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Zero disables caching
    pub cache_ttl_secs: u64,
    pub fixture_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            provider: CatalogProvider::Fixture,
            base_url: catalog::tmdb::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
            max_retries: 1,
            backoff_base_ms: 250,
            cache_ttl_secs: 300,
            fixture_path: PathBuf::from("data/catalog.json"),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Genres queried per recommendation run
    pub top_genres: usize,
    pub pages_per_genre: u32,
    pub default_limit: usize,
    pub weights: ScoringWeights,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            top_genres: 5,
            pages_per_genre: 1,
            default_limit: 10,
            weights: ScoringWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub max_groups_per_user: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            max_groups_per_user: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Expiry sweep period; zero disables the sweeper
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub timeout_ms: u64,
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            channel_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// # Arguments
    /// * `path` - Explicit config file; when `None` the default file is
    ///   used if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from(file).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.provider == CatalogProvider::Tmdb
            && self.catalog.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "catalog.api_key is required for the tmdb provider".to_string(),
            ));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(ConfigError::Invalid("catalog.timeout_secs must be positive".to_string()));
        }
        if self.recommendations.top_genres == 0 {
            return Err(ConfigError::Invalid(
                "recommendations.top_genres must be positive".to_string(),
            ));
        }
        if self.recommendations.pages_per_genre == 0 {
            return Err(ConfigError::Invalid(
                "recommendations.pages_per_genre must be positive".to_string(),
            ));
        }
        self.recommendations
            .weights
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.groups.max_groups_per_user == 0 {
            return Err(ConfigError::Invalid(
                "groups.max_groups_per_user must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.groups.max_groups_per_user, 10);
        assert_eq!(config.catalog.provider, CatalogProvider::Fixture);
        assert_eq!(config.catalog.cache_ttl(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_tmdb_requires_api_key() {
        let mut config = AppConfig::default();
        config.catalog.provider = CatalogProvider::Tmdb;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));

        config.catalog.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_top_genres_rejected() {
        let mut config = AppConfig::default();
        config.recommendations.top_genres = 0;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("movie-night-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[catalog]\ncache_ttl_secs = 0\n\n[recommendations]\ntop_genres = 3\n\n[recommendations.weights]\nrating = 4.0\n\n[log]\njson = true"
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.recommendations.top_genres, 3);
        assert_eq!(config.recommendations.weights.rating, 4.0);
        // Unset weights keep their defaults
        assert_eq!(config.recommendations.weights.genre_preference, 2.0);
        assert_eq!(config.catalog.cache_ttl(), None);
        assert!(config.log.json);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/nonexistent/movie-night.toml");
        assert_matches!(AppConfig::load(Some(missing)), Err(ConfigError::Load(_)));
    }
}
