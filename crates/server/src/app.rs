//! Wiring: builds the store, catalog stack, notifiers and services from
//! configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use catalog::{
    CachedCatalog, FixtureCatalog, MovieCatalog, RetryPolicy, RetryingCatalog, TmdbCatalog, TmdbConfig,
};
use domain::{GroupId, MovieCandidate};
use fanout::{BroadcastNotifier, CompositeNotifier, Dispatcher, LogNotifier};
use pipeline::ScoringPipeline;
use store::{InMemoryStore, Store};

use crate::config::{AppConfig, CatalogConfig, CatalogProvider};
use crate::services::{GroupService, PreferenceService, RecommendationEngine, UserService, VotingService};

/// All services sharing one store, catalog and notifier set.
#[derive(Clone)]
pub struct App {
    pub config: AppConfig,
    pub users: UserService,
    pub groups: GroupService,
    pub preferences: PreferenceService,
    pub engine: RecommendationEngine,
    pub voting: VotingService,
    /// Realtime event feed; subscribe to receive every notification
    pub events: Arc<BroadcastNotifier>,
}

impl App {
    /// Build the application with the catalog selected by `config`.
    pub fn build(config: AppConfig) -> Result<Self> {
        let catalog = build_catalog(&config.catalog)?;
        Ok(Self::with_catalog(config, catalog))
    }

    /// Build the application around an already constructed catalog.
    pub fn with_catalog(config: AppConfig, catalog: Arc<dyn MovieCatalog>) -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let events = Arc::new(BroadcastNotifier::new(config.notifications.channel_capacity));
        let notifier = CompositeNotifier::new()
            .with(Arc::new(LogNotifier))
            .with(events.clone());
        let notifications = Dispatcher::new(Arc::new(notifier))
            .with_timeout(Duration::from_millis(config.notifications.timeout_ms));

        let engine = RecommendationEngine::new(
            catalog,
            ScoringPipeline::from_weights(&config.recommendations.weights),
        )
        .with_top_genres(config.recommendations.top_genres)
        .with_pages_per_genre(config.recommendations.pages_per_genre);

        let groups = GroupService::new(
            store.clone(),
            notifications.clone(),
            config.groups.max_groups_per_user,
        );

        Self {
            users: UserService::new(store.clone()),
            preferences: PreferenceService::new(groups.clone()),
            voting: VotingService::new(store, engine.clone(), notifications),
            groups,
            engine,
            events,
            config,
        }
    }

    /// Recommendations for a group the caller belongs to. `limit` falls back
    /// to the configured default.
    pub async fn recommend_for_group(
        &self,
        group_id: GroupId,
        caller: &str,
        limit: Option<usize>,
    ) -> domain::Result<Vec<MovieCandidate>> {
        let group = self.groups.get_group(group_id, caller).await?;
        let limit = limit.unwrap_or(self.config.recommendations.default_limit);
        self.engine.recommend(&group, limit).await
    }
}

/// Provider client, wrapped in retry and then cache decorators.
pub fn build_catalog(config: &CatalogConfig) -> Result<Arc<dyn MovieCatalog>> {
    let provider: Arc<dyn MovieCatalog> = match config.provider {
        CatalogProvider::Fixture => {
            let fixture = FixtureCatalog::load_from_file(&config.fixture_path).with_context(|| {
                format!("Failed to load catalog fixture {}", config.fixture_path.display())
            })?;
            info!(movies = fixture.movie_count(), "fixture catalog loaded");
            Arc::new(fixture)
        }
        CatalogProvider::Tmdb => {
            let api_key = config
                .api_key
                .clone()
                .context("catalog.api_key is required for the tmdb provider")?;
            let tmdb = TmdbCatalog::new(
                TmdbConfig::new(api_key)
                    .with_base_url(config.base_url.clone())
                    .with_timeout(config.timeout()),
            )
            .context("Failed to build TMDB client")?;
            info!(base_url = %config.base_url, "tmdb catalog configured");
            Arc::new(tmdb)
        }
    };

    let policy = RetryPolicy {
        max_retries: config.max_retries,
        base_delay: Duration::from_millis(config.backoff_base_ms),
        ..RetryPolicy::default()
    };
    let retrying: Arc<dyn MovieCatalog> = Arc::new(RetryingCatalog::new(provider, policy));

    Ok(match config.cache_ttl() {
        Some(ttl) => Arc::new(CachedCatalog::new(retrying, ttl)),
        None => retrying,
    })
}
