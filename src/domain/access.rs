//! Requester identity as seen by the visibility rules.

use std::collections::BTreeSet;

use super::types::{Capability, PermissionLevel};

/// Login state and capabilities of whoever issued a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub logged_in: bool,
    pub capabilities: BTreeSet<Capability>,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            logged_in: true,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// `manage_options` is what separates administrators from everyone else.
    pub fn permission_level(&self) -> PermissionLevel {
        if self.can(Capability::ManageOptions) {
            PermissionLevel::Administrator
        } else {
            PermissionLevel::Standard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manage_options_maps_to_administrator() {
        let admin = Requester::logged_in([Capability::Read, Capability::ManageOptions]);
        assert_eq!(admin.permission_level(), PermissionLevel::Administrator);

        let subscriber = Requester::logged_in([Capability::Read, Capability::ReadPrivatePosts]);
        assert_eq!(subscriber.permission_level(), PermissionLevel::Standard);

        assert_eq!(
            Requester::anonymous().permission_level(),
            PermissionLevel::Standard
        );
    }
}
