//! Object cache backends.
//!
//! The episode lister talks to an [`ObjectCache`]: a grouped key/value store
//! with per-entry expiry. [`MemoryObjectCache`] is the in-process backend.
//!
//! Each group carries an invalidation generation. A writer that read its data
//! under generation `n` stores it with [`ObjectCache::set_if_generation`], which
//! refuses the write once an invalidation has moved the group past `n`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

use super::keys::CacheKey;
use crate::util::clock::Clock;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Grouped key/value cache with expiring entries.
pub trait ObjectCache: Send + Sync {
    /// Returns the stored value unless it is missing or expired.
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError>;

    /// Stores `value`; a zero `ttl`, or one past the calendar range, never expires.
    fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes one entry, returning whether it existed.
    fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Current invalidation generation of `group`.
    fn generation(&self, group: &str) -> Result<u64, CacheError>;

    /// Advances the generation of `group` and returns the new value.
    fn bump_generation(&self, group: &str) -> Result<u64, CacheError>;

    /// Stores `value` only while the key's group is still at `generation`.
    /// Returns `false` when the write was refused.
    fn set_if_generation(
        &self,
        key: &CacheKey,
        value: Value,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<OffsetDateTime>,
}

impl CacheEntry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Expiry instant for an entry written at `now`. A zero TTL, or one that runs
/// past the representable range, never expires.
fn expiry(now: OffsetDateTime, ttl: Duration) -> Option<OffsetDateTime> {
    if ttl.is_zero() {
        return None;
    }
    time::Duration::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
}

#[derive(Default)]
struct Slots {
    entries: HashMap<CacheKey, CacheEntry>,
    generations: HashMap<String, u64>,
}

impl Slots {
    fn generation(&self, group: &str) -> u64 {
        self.generations.get(group).copied().unwrap_or(0)
    }

    fn insert(&mut self, key: &CacheKey, value: Value, now: OffsetDateTime, ttl: Duration) {
        self.entries.retain(|_, entry| entry.is_live(now));
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                expires_at: expiry(now, ttl),
            },
        );
    }
}

/// In-process object cache. Expired entries are dropped lazily on write.
pub struct MemoryObjectCache {
    slots: RwLock<Slots>,
    clock: Arc<dyn Clock>,
}

impl MemoryObjectCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until the next write.
    pub fn len(&self) -> usize {
        self.read_slots("len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self, op: &'static str) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|poisoned| {
            warn!(
                op,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned object cache lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }

    fn write_slots(&self, op: &'static str) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|poisoned| {
            warn!(
                op,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned object cache lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }
}

impl ObjectCache for MemoryObjectCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        Ok(self
            .read_slots("get")
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.write_slots("set").insert(key, value, now, ttl);
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.write_slots("delete").entries.remove(key).is_some())
    }

    fn generation(&self, group: &str) -> Result<u64, CacheError> {
        Ok(self.read_slots("generation").generation(group))
    }

    fn bump_generation(&self, group: &str) -> Result<u64, CacheError> {
        let mut slots = self.write_slots("bump_generation");
        let next = slots.generation(group).wrapping_add(1);
        slots.generations.insert(group.to_string(), next);
        Ok(next)
    }

    fn set_if_generation(
        &self,
        key: &CacheKey,
        value: Value,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let now = self.clock.now();
        let mut slots = self.write_slots("set_if_generation");
        if slots.generation(key.group()) != generation {
            return Ok(false);
        }
        slots.insert(key, value, now, ttl);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;
    use time::macros::datetime;

    use super::*;
    use crate::util::clock::ManualClock;

    fn cache() -> (Arc<ManualClock>, MemoryObjectCache) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-03-09 12:00 UTC)));
        let cache = MemoryObjectCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (clock, cache) = cache();
        let key = CacheKey::episode_ids();

        cache
            .set(&key, json!([3, 2, 1]), Duration::from_secs(60))
            .expect("set");
        assert_eq!(cache.get(&key).expect("get"), Some(json!([3, 2, 1])));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(&key).expect("get").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).expect("get").is_none());
    }

    #[test]
    fn zero_ttl_never_expires() {
        let (clock, cache) = cache();
        let key = CacheKey::new("ssp", "forever");

        cache.set(&key, json!(true), Duration::ZERO).expect("set");
        clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
        assert_eq!(cache.get(&key).expect("get"), Some(json!(true)));
    }

    #[test]
    fn writes_drop_expired_entries() {
        let (clock, cache) = cache();
        cache
            .set(&CacheKey::new("ssp", "old"), json!(1), Duration::from_secs(10))
            .expect("set");
        clock.advance(Duration::from_secs(11));
        cache
            .set(&CacheKey::new("ssp", "new"), json!(2), Duration::from_secs(10))
            .expect("set");

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ttl_beyond_the_calendar_never_expires() {
        let (clock, cache) = cache();
        let key = CacheKey::episode_ids();

        cache
            .set(&key, json!([1]), Duration::from_secs(u64::MAX))
            .expect("set");
        clock.advance(Duration::from_secs(100 * 365 * 24 * 60 * 60));
        assert_eq!(cache.get(&key).expect("get"), Some(json!([1])));
    }

    #[test]
    fn delete_reports_whether_entry_existed() {
        let (_clock, cache) = cache();
        let ttl = Duration::from_secs(60);
        cache.set(&CacheKey::new("ssp", "a"), json!(1), ttl).expect("set");
        cache.set(&CacheKey::new("other", "a"), json!(3), ttl).expect("set");

        assert!(cache.delete(&CacheKey::new("ssp", "a")).expect("delete"));
        assert!(!cache.delete(&CacheKey::new("ssp", "a")).expect("delete"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn write_under_a_stale_generation_is_refused() {
        let (_clock, cache) = cache();
        let key = CacheKey::episode_ids();
        let ttl = Duration::from_secs(60);

        let read_at = cache.generation(key.group()).expect("generation");
        assert_eq!(cache.bump_generation(key.group()).expect("bump"), read_at + 1);

        let stored = cache
            .set_if_generation(&key, json!([1, 2]), ttl, read_at)
            .expect("conditional set");
        assert!(!stored);
        assert!(cache.get(&key).expect("get").is_none());

        let current = cache.generation(key.group()).expect("generation");
        assert!(
            cache
                .set_if_generation(&key, json!([1]), ttl, current)
                .expect("conditional set")
        );
        assert_eq!(cache.get(&key).expect("get"), Some(json!([1])));
    }

    #[test]
    fn generations_are_tracked_per_group() {
        let (_clock, cache) = cache();
        cache.bump_generation("ssp").expect("bump");

        assert_eq!(cache.generation("ssp").expect("generation"), 1);
        assert_eq!(cache.generation("other").expect("generation"), 0);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let (_clock, cache) = cache();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.slots.write().expect("slots lock should be acquired");
            panic!("poison entries lock");
        }));

        let key = CacheKey::episode_ids();
        cache.set(&key, json!([1]), Duration::from_secs(60)).expect("set");
        assert!(cache.get(&key).expect("get").is_some());
    }
}
