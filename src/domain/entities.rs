//! Content records as the content store hands them out.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::types::{ContentStatus, ContentType};

/// Opaque identifier of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItemId(pub u64);

impl fmt::Display for ContentItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContentItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentItemId,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: ContentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ContentItem {
    /// True when `key` is present with a non-blank value.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .is_some_and(|value| !value.trim().is_empty())
    }
}
