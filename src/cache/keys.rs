//! Cache key definitions.

use std::fmt;

use crate::domain::types::PermissionLevel;

/// Group holding every episode cache entry.
pub const EPISODE_CACHE_GROUP: &str = "ssp";
/// Name of the shared episode-ID entry.
pub const EPISODE_IDS_KEY: &str = "episode_ids";

/// A cache entry name scoped to a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    group: String,
    name: String,
}

impl CacheKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// The single entry shared by every requester.
    pub fn episode_ids() -> Self {
        Self::new(EPISODE_CACHE_GROUP, EPISODE_IDS_KEY)
    }

    /// Entry scoped to one permission tier.
    pub fn episode_ids_for(permission: PermissionLevel) -> Self {
        Self::new(
            EPISODE_CACHE_GROUP,
            format!("{EPISODE_IDS_KEY}:{}", permission.as_str()),
        )
    }

    /// Every key the episode lister may write, whatever its scope.
    pub fn all_episode_keys() -> [Self; 3] {
        [
            Self::episode_ids(),
            Self::episode_ids_for(PermissionLevel::Administrator),
            Self::episode_ids_for(PermissionLevel::Standard),
        ]
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_key_matches_legacy_names() {
        let key = CacheKey::episode_ids();
        assert_eq!(key.group(), "ssp");
        assert_eq!(key.name(), "episode_ids");
        assert_eq!(key.to_string(), "ssp/episode_ids");
    }

    #[test]
    fn scoped_keys_differ_per_tier() {
        let admin = CacheKey::episode_ids_for(PermissionLevel::Administrator);
        let standard = CacheKey::episode_ids_for(PermissionLevel::Standard);

        assert_ne!(admin, standard);
        assert_ne!(admin, CacheKey::episode_ids());
        assert_eq!(standard.name(), "episode_ids:standard");
        assert!(CacheKey::all_episode_keys().contains(&admin));
    }
}
