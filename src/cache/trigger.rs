//! Cache trigger service.
//!
//! Write paths report content changes here; every cached episode list is
//! dropped so the next read goes back to the content store. The episode group's
//! generation is advanced first, so a refresh that read the store before the
//! change cannot write its list back afterwards.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::events::ContentChange;
use super::keys::{CacheKey, EPISODE_CACHE_GROUP};
use super::store::ObjectCache;

pub(crate) const METRIC_EPISODE_CACHE_INVALIDATE: &str =
    "privatecast_episode_cache_invalidate_total";

/// Invalidates cached episode lists when content changes.
///
/// # Usage
///
/// ```ignore
/// // After a successful episode update:
/// trigger.content_changed(&ContentChange::updated(item.id, item.content_type.clone()));
/// ```
pub struct CacheTrigger {
    config: CacheConfig,
    cache: Arc<dyn ObjectCache>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, cache: Arc<dyn ObjectCache>) -> Self {
        Self { config, cache }
    }

    /// Drops every episode cache entry. Returns how many entries existed.
    pub fn content_changed(&self, change: &ContentChange) -> usize {
        if !self.config.enabled {
            debug!(
                change = change.kind.as_str(),
                item_id = %change.item_id,
                "Cache trigger skipped: cache disabled"
            );
            return 0;
        }

        let dropped = invalidate_episode_keys(self.cache.as_ref());

        info!(
            change = change.kind.as_str(),
            item_id = %change.item_id,
            content_type = %change.content_type,
            dropped,
            "Episode cache invalidated"
        );

        dropped
    }
}

/// Advances the episode generation, then deletes every episode key. Backend
/// failures are logged and skipped.
pub(crate) fn invalidate_episode_keys(cache: &dyn ObjectCache) -> usize {
    if let Err(err) = cache.bump_generation(EPISODE_CACHE_GROUP) {
        warn!(
            group = EPISODE_CACHE_GROUP,
            error = %err,
            "Failed to advance episode cache generation"
        );
    }

    let mut dropped = 0;
    for key in CacheKey::all_episode_keys() {
        match cache.delete(&key) {
            Ok(true) => dropped += 1,
            Ok(false) => {}
            Err(err) => warn!(key = %key, error = %err, "Failed to delete episode cache entry"),
        }
    }
    counter!(METRIC_EPISODE_CACHE_INVALIDATE).increment(1);
    dropped
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use time::OffsetDateTime;

    use super::*;
    use crate::cache::store::MemoryObjectCache;
    use crate::domain::entities::ContentItemId;
    use crate::domain::types::{ContentType, PermissionLevel};
    use crate::util::clock::SystemClock;

    fn seeded_cache() -> Arc<MemoryObjectCache> {
        let cache = Arc::new(MemoryObjectCache::new(Arc::new(SystemClock)));
        let ttl = Duration::from_secs(60);
        cache
            .set(&CacheKey::episode_ids(), json!([1, 2]), ttl)
            .expect("set");
        cache
            .set(
                &CacheKey::episode_ids_for(PermissionLevel::Standard),
                json!([1]),
                ttl,
            )
            .expect("set");
        cache
            .set(&CacheKey::new("ssp", "unrelated"), json!("keep"), ttl)
            .expect("set");
        cache
    }

    #[test]
    fn content_change_drops_every_episode_entry() {
        let cache = seeded_cache();
        let trigger = CacheTrigger::new(CacheConfig::default(), cache.clone());

        let dropped = trigger.content_changed(&ContentChange::updated(
            ContentItemId(1),
            ContentType::podcast(),
        ));

        assert_eq!(dropped, 2);
        assert_eq!(cache.generation(EPISODE_CACHE_GROUP).expect("generation"), 1);
        assert!(cache.get(&CacheKey::episode_ids()).expect("get").is_none());
        assert!(
            cache
                .get(&CacheKey::new("ssp", "unrelated"))
                .expect("get")
                .is_some()
        );
    }

    #[test]
    fn trigger_respects_disabled_config() {
        let cache = seeded_cache();
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let trigger = CacheTrigger::new(config, cache.clone());

        let change = ContentChange {
            observed_at: OffsetDateTime::UNIX_EPOCH,
            ..ContentChange::deleted(ContentItemId(2), ContentType::podcast())
        };
        assert_eq!(trigger.content_changed(&change), 0);
        assert_eq!(cache.generation(EPISODE_CACHE_GROUP).expect("generation"), 0);
        assert!(cache.get(&CacheKey::episode_ids()).expect("get").is_some());
    }
}
