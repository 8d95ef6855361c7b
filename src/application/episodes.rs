//! Episode lister: visibility-filtered episode IDs behind a TTL cache.
//!
//! A miss runs the content store query in its own task under a per-key gate.
//! Concurrent misses wait for that refresh instead of issuing their own, and a
//! caller that goes away does not cancel it. The refresh writes back only if no
//! invalidation happened since the cache generation was read.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, histogram};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use super::hooks::{DEFAULT_AUDIO_ATTRIBUTE_KEY, EpisodeHooks};
use super::listeners::with_expansion_suppressed;
use super::repos::{ContentQuery, ContentStore, RepoError};
use crate::cache::{
    CacheConfig, CacheKey, CacheScope, EPISODE_CACHE_GROUP, ObjectCache, invalidate_episode_keys,
};
use crate::domain::entities::ContentItemId;
use crate::domain::types::{ContentType, PermissionLevel};
use crate::domain::visibility::VisibilityPolicy;
use crate::util::clock::Clock;

const METRIC_EPISODE_CACHE_HIT: &str = "privatecast_episode_cache_hit_total";
const METRIC_EPISODE_CACHE_MISS: &str = "privatecast_episode_cache_miss_total";
const METRIC_EPISODE_CACHE_REFRESH: &str = "privatecast_episode_cache_refresh_total";
const METRIC_EPISODE_QUERY_MS: &str = "privatecast_episode_query_ms";

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error("content store query timed out after {0:?}")]
    Timeout(Duration),
    #[error("episode refresh task failed: {0}")]
    Refresh(String),
}

#[derive(Debug, Clone)]
pub struct EpisodeListerConfig {
    /// Attribute required when other content types are mixed in.
    pub audio_attribute_key: String,
    pub query_timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for EpisodeListerConfig {
    fn default() -> Self {
        Self {
            audio_attribute_key: DEFAULT_AUDIO_ATTRIBUTE_KEY.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            cache: CacheConfig::default(),
        }
    }
}

impl From<&crate::config::Settings> for EpisodeListerConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            audio_attribute_key: settings.episodes.audio_attribute_key.clone(),
            query_timeout: settings.episodes.query_timeout,
            cache: CacheConfig::from(&settings.cache),
        }
    }
}

pub struct EpisodeLister {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn ObjectCache>,
    hooks: EpisodeHooks,
    policy: VisibilityPolicy,
    clock: Arc<dyn Clock>,
    config: EpisodeListerConfig,
    refresh_gates: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl EpisodeLister {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn ObjectCache>,
        policy: VisibilityPolicy,
        clock: Arc<dyn Clock>,
        config: EpisodeListerConfig,
    ) -> Self {
        Self {
            store,
            cache,
            hooks: EpisodeHooks::new(),
            policy,
            clock,
            config,
            refresh_gates: DashMap::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: EpisodeHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builds the store query for `requester` without touching the cache.
    pub fn build_query(
        &self,
        requester: PermissionLevel,
        additional_types: &BTreeSet<ContentType>,
    ) -> ContentQuery {
        let mut extra = additional_types.clone();
        extra.extend(self.hooks.additional_content_types());
        extra.remove(&ContentType::podcast());

        let mut query = ContentQuery::podcast();
        if !extra.is_empty() {
            query.content_types.extend(extra);
            query.require_attribute(
                self.hooks
                    .audio_attribute_key(&self.config.audio_attribute_key),
            );
        }

        let filter = self.policy.compute(requester, self.clock.now());
        query.apply_visibility(&filter);
        self.hooks.extend_query(&mut query);
        query
    }

    pub fn cache_key(&self, requester: PermissionLevel) -> CacheKey {
        match self.config.cache.scope {
            CacheScope::Shared => CacheKey::episode_ids(),
            CacheScope::PerPermission => CacheKey::episode_ids_for(requester),
        }
    }

    /// Episode IDs visible to `requester`, served from cache while fresh.
    ///
    /// With the shared scope a fresh entry is returned whoever filled it.
    #[instrument(skip(self, additional_types))]
    pub async fn list_episode_ids(
        &self,
        requester: PermissionLevel,
        additional_types: &BTreeSet<ContentType>,
    ) -> Result<Vec<ContentItemId>, EpisodeError> {
        let query = self.build_query(requester, additional_types);
        let key = self.cache_key(requester);

        if let Some(ids) = self.cached_ids(&key) {
            counter!(METRIC_EPISODE_CACHE_HIT).increment(1);
            debug!(key = %key, episodes = ids.len(), "Episode cache hit");
            return Ok(ids);
        }
        counter!(METRIC_EPISODE_CACHE_MISS).increment(1);

        let gate = self.refresh_gates.entry(key.clone()).or_default().clone();
        let permit = gate.lock_owned().await;

        if let Some(ids) = self.cached_ids(&key) {
            counter!(METRIC_EPISODE_CACHE_HIT).increment(1);
            debug!(key = %key, "Episode cache filled by concurrent refresh");
            return Ok(ids);
        }

        let refresh = Refresh {
            store: self.store.clone(),
            cache: self.cache.clone(),
            generation: self.write_generation(&key),
            key,
            ttl: self.config.cache.ttl,
            timeout: self.config.query_timeout,
        };

        tokio::spawn(refresh.run(query, permit))
            .await
            .map_err(|err| EpisodeError::Refresh(err.to_string()))?
    }

    /// Drops every cached episode list.
    pub fn invalidate(&self) -> usize {
        invalidate_episode_keys(self.cache.as_ref())
    }

    /// Generation a refresh must still see to store its result. `None` skips
    /// the write.
    fn write_generation(&self, key: &CacheKey) -> Option<u64> {
        if !self.config.cache.enabled {
            return None;
        }
        match self.cache.generation(EPISODE_CACHE_GROUP) {
            Ok(generation) => Some(generation),
            Err(err) => {
                warn!(
                    key = %key,
                    error = %err,
                    "Episode cache generation unreadable; result will not be cached"
                );
                None
            }
        }
    }

    fn cached_ids(&self, key: &CacheKey) -> Option<Vec<ContentItemId>> {
        if !self.config.cache.enabled {
            return None;
        }

        let value = match self.cache.get(key) {
            Ok(value) => value?,
            Err(err) => {
                warn!(key = %key, error = %err, "Episode cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(ids) => Some(ids),
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding undecodable episode cache entry");
                None
            }
        }
    }
}

struct Refresh {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn ObjectCache>,
    generation: Option<u64>,
    key: CacheKey,
    ttl: Duration,
    timeout: Duration,
}

impl Refresh {
    async fn run(
        self,
        query: ContentQuery,
        _permit: OwnedMutexGuard<()>,
    ) -> Result<Vec<ContentItemId>, EpisodeError> {
        let started_at = Instant::now();
        let outcome = with_expansion_suppressed(tokio::time::timeout(
            self.timeout,
            self.store.query_ids(&query),
        ))
        .await;
        histogram!(METRIC_EPISODE_QUERY_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let ids = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(key = %self.key, timeout = ?self.timeout, "Episode query timed out");
                return Err(EpisodeError::Timeout(self.timeout));
            }
        };

        counter!(METRIC_EPISODE_CACHE_REFRESH).increment(1);
        info!(key = %self.key, episodes = ids.len(), "Episode list refreshed");

        if let Some(generation) = self.generation {
            self.store_ids(&ids, generation);
        }
        Ok(ids)
    }

    fn store_ids(&self, ids: &[ContentItemId], generation: u64) {
        let value = match serde_json::to_value(ids) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %self.key, error = %err, "Failed to encode episode list");
                return;
            }
        };
        self.write(value, generation);
    }

    fn write(&self, value: Value, generation: u64) {
        match self
            .cache
            .set_if_generation(&self.key, value, self.ttl, generation)
        {
            Ok(true) => {}
            Ok(false) => debug!(
                key = %self.key,
                generation,
                "Episode cache invalidated during refresh; result not stored"
            ),
            Err(err) => warn!(key = %self.key, error = %err, "Episode cache write failed"),
        }
    }
}
