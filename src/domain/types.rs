//! Shared domain enumerations and identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Publication status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Published,
    Private,
    Scheduled,
    Draft,
    Pending,
    Trash,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Published => "published",
            ContentStatus::Private => "private",
            ContentStatus::Scheduled => "scheduled",
            ContentStatus::Draft => "draft",
            ContentStatus::Pending => "pending",
            ContentStatus::Trash => "trash",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ContentStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "published" | "publish" => Ok(ContentStatus::Published),
            "private" => Ok(ContentStatus::Private),
            "scheduled" | "future" => Ok(ContentStatus::Scheduled),
            "draft" => Ok(ContentStatus::Draft),
            "pending" => Ok(ContentStatus::Pending),
            "trash" => Ok(ContentStatus::Trash),
            _ => Err(()),
        }
    }
}

/// Coarse permission tier of whoever is asking for content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Sees everything, including episodes scheduled for the future.
    Administrator,
    /// Sees episodes published before the start of tomorrow.
    Standard,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::Administrator => "administrator",
            PermissionLevel::Standard => "standard",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named capabilities a role may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    ManageOptions,
    ReadPrivatePosts,
    ReadPrivatePages,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::ManageOptions => "manage_options",
            Capability::ReadPrivatePosts => "read_private_posts",
            Capability::ReadPrivatePages => "read_private_pages",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type tag such as `podcast` or `post`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentType(String);

impl ContentType {
    pub const PODCAST: &'static str = "podcast";

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("content type must not be empty"));
        }
        if !trimmed
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-')
        {
            return Err(DomainError::validation(format!(
                "content type `{trimmed}` may only contain lowercase letters, digits, `_` and `-`"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn podcast() -> Self {
        Self(Self::PODCAST.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_podcast(&self) -> bool {
        self.0 == Self::PODCAST
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_legacy_aliases() {
        assert_eq!(
            ContentStatus::try_from("publish"),
            Ok(ContentStatus::Published)
        );
        assert_eq!(
            ContentStatus::try_from("future"),
            Ok(ContentStatus::Scheduled)
        );
        assert!(ContentStatus::try_from("inherit").is_err());
    }

    #[test]
    fn content_type_is_trimmed_and_validated() {
        let ty = ContentType::new("  post ").expect("valid type");
        assert_eq!(ty.as_str(), "post");

        assert!(ContentType::new("").is_err());
        assert!(ContentType::new("Podcast Episode").is_err());
        assert!(ContentType::podcast().is_podcast());
    }

    #[test]
    fn content_type_deserializes_through_validation() {
        let ok: ContentType = serde_json::from_str("\"episode-video\"").expect("valid type");
        assert_eq!(ok.as_str(), "episode-video");

        let err = serde_json::from_str::<ContentType>("\"Bad Type\"");
        assert!(err.is_err());
    }
}
