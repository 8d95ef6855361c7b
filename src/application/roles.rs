//! Role registry and the startup capability grant.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::domain::types::Capability;

pub const SUBSCRIBER_ROLE: &str = "subscriber";
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Capabilities subscribers need to see private episodes.
pub const PRIVATE_READ_CAPABILITIES: [Capability; 2] =
    [Capability::ReadPrivatePosts, Capability::ReadPrivatePages];

#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<BTreeMap<String, BTreeSet<Capability>>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `administrator` with every capability and `subscriber` with `read`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.grant(
            ADMINISTRATOR_ROLE,
            [
                Capability::Read,
                Capability::ManageOptions,
                Capability::ReadPrivatePosts,
                Capability::ReadPrivatePages,
            ],
        );
        registry.grant(SUBSCRIBER_ROLE, [Capability::Read]);
        registry
    }

    /// Adds `capabilities` to `role`, creating it when missing.
    ///
    /// Returns the capabilities that were not held before.
    pub fn grant(
        &self,
        role: &str,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> BTreeSet<Capability> {
        let mut roles = self.write_roles();
        let held = roles.entry(role.to_string()).or_default();
        capabilities
            .into_iter()
            .filter(|capability| held.insert(*capability))
            .collect()
    }

    pub fn capabilities(&self, role: &str) -> Option<BTreeSet<Capability>> {
        self.read_roles().get(role).cloned()
    }

    pub fn role_names(&self) -> Vec<String> {
        self.read_roles().keys().cloned().collect()
    }

    fn read_roles(&self) -> RwLockReadGuard<'_, BTreeMap<String, BTreeSet<Capability>>> {
        self.roles.read().unwrap_or_else(|poisoned| {
            warn!(
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned role registry lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }

    fn write_roles(&self) -> RwLockWriteGuard<'_, BTreeMap<String, BTreeSet<Capability>>> {
        self.roles.write().unwrap_or_else(|poisoned| {
            warn!(
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned role registry lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }
}

/// Grants private read access to subscribers. Safe to run on every startup.
pub fn grant_private_read_to_subscribers(registry: &RoleRegistry) -> BTreeSet<Capability> {
    let added = registry.grant(SUBSCRIBER_ROLE, PRIVATE_READ_CAPABILITIES);
    if added.is_empty() {
        info!(role = SUBSCRIBER_ROLE, "Private read capabilities already granted");
    } else {
        let added_names: Vec<_> = added.iter().map(|cap| cap.as_str()).collect();
        info!(role = SUBSCRIBER_ROLE, added = ?added_names, "Granted private read capabilities");
    }
    added
}
