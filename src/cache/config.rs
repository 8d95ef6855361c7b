//! Cache configuration.
//!
//! Controls the episode-ID cache via `privatecast.toml`.

use std::time::Duration;

use serde::Deserialize;

/// Twelve hours, the lifetime of a cached episode list.
pub const DEFAULT_EPISODE_TTL_SECS: u64 = 12 * 60 * 60;

/// Longest accepted episode-list lifetime: one year.
pub const MAX_EPISODE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// How cached episode lists are shared between requesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// One list for everyone, whoever filled it.
    #[default]
    Shared,
    /// One list per permission tier.
    PerPermission,
}

impl CacheScope {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheScope::Shared => "shared",
            CacheScope::PerPermission => "per_permission",
        }
    }
}

impl TryFrom<&str> for CacheScope {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "shared" => Ok(CacheScope::Shared),
            "per_permission" => Ok(CacheScope::PerPermission),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is stored.
    pub enabled: bool,
    /// Lifetime of a stored episode list.
    pub ttl: Duration,
    pub scope: CacheScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_EPISODE_TTL_SECS),
            scope: CacheScope::Shared,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: Duration::from_secs(settings.ttl_seconds.get()),
            scope: settings.scope,
        }
    }
}
