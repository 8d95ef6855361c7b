//! Episode cache.
//!
//! Holds the visibility-filtered episode-ID list behind a grouped object cache:
//!
//! - **Keys**: `episode_ids` in group `ssp`, optionally one entry per permission tier
//! - **Store**: [`ObjectCache`] backends with per-entry expiry (12 hours by default)
//! - **Trigger**: content create/update/delete drops every episode entry
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 43200
//! scope = "shared" # or "per_permission"
//! ```

mod config;
mod events;
mod keys;
mod store;
mod trigger;

pub use config::{CacheConfig, CacheScope, DEFAULT_EPISODE_TTL_SECS, MAX_EPISODE_TTL_SECS};
pub use events::{ChangeKind, ContentChange};
pub use keys::{CacheKey, EPISODE_CACHE_GROUP, EPISODE_IDS_KEY};
pub use store::{CacheError, MemoryObjectCache, ObjectCache};
pub use trigger::CacheTrigger;
pub(crate) use trigger::invalidate_episode_keys;
