//! Content store contract and the query descriptor it accepts.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ContentItem, ContentItemId};
use crate::domain::types::{ContentStatus, ContentType};
use crate::domain::visibility::{PublishBound, VisibilityFilter};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
}

/// Attribute requirement evaluated per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeConstraint {
    /// The attribute exists with a non-blank value.
    Present { key: String },
}

impl AttributeConstraint {
    pub fn present(key: impl Into<String>) -> Self {
        Self::Present { key: key.into() }
    }

    pub fn key(&self) -> &str {
        match self {
            AttributeConstraint::Present { key } => key,
        }
    }

    pub fn is_satisfied_by(&self, item: &ContentItem) -> bool {
        match self {
            AttributeConstraint::Present { key } => item.has_attribute(key),
        }
    }
}

/// Query descriptor handed to a [`ContentStore`].
///
/// Results are identifiers only, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub content_types: BTreeSet<ContentType>,
    /// `None` leaves the store default in place (published only).
    pub statuses: Option<BTreeSet<ContentStatus>>,
    pub published_before: Option<PublishBound>,
    pub attribute_constraints: Vec<AttributeConstraint>,
    /// `None` fetches every match.
    pub limit: Option<NonZeroUsize>,
}

impl ContentQuery {
    pub fn for_types(content_types: impl IntoIterator<Item = ContentType>) -> Self {
        Self {
            content_types: content_types.into_iter().collect(),
            statuses: None,
            published_before: None,
            attribute_constraints: Vec::new(),
            limit: None,
        }
    }

    pub fn podcast() -> Self {
        Self::for_types([ContentType::podcast()])
    }

    /// True when the query targets exactly `content_type` and nothing else.
    pub fn targets_only(&self, content_type: &str) -> bool {
        self.content_types.len() == 1
            && self
                .content_types
                .first()
                .is_some_and(|ty| ty.as_str() == content_type)
    }

    /// Replaces the statuses and, when the filter carries one, the publish bound.
    pub fn apply_visibility(&mut self, filter: &VisibilityFilter) {
        self.statuses = Some(filter.statuses().clone());
        if let Some(bound) = filter.upper_bound() {
            self.published_before = Some(bound);
        }
    }

    pub fn require_attribute(&mut self, key: impl Into<String>) {
        let constraint = AttributeConstraint::present(key);
        if !self.attribute_constraints.contains(&constraint) {
            self.attribute_constraints.push(constraint);
        }
    }

    pub fn effective_statuses(&self) -> BTreeSet<ContentStatus> {
        self.statuses
            .clone()
            .unwrap_or_else(|| BTreeSet::from([ContentStatus::Published]))
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        self.content_types.contains(&item.content_type)
            && self.effective_statuses().contains(&item.status)
            && self
                .published_before
                .is_none_or(|bound| bound.admits(item.published_at))
            && self
                .attribute_constraints
                .iter()
                .all(|constraint| constraint.is_satisfied_by(item))
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Identifiers of every item matching `query`, newest first.
    async fn query_ids(&self, query: &ContentQuery) -> Result<Vec<ContentItemId>, RepoError>;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono_tz::Tz;
    use time::macros::{date, datetime};

    use super::*;
    use crate::domain::types::PermissionLevel;
    use crate::domain::visibility::compute_filter;

    fn episode(status: ContentStatus, audio: Option<&str>) -> ContentItem {
        let mut attributes = BTreeMap::new();
        if let Some(audio) = audio {
            attributes.insert("audio_file".to_string(), audio.to_string());
        }
        ContentItem {
            id: ContentItemId(1),
            content_type: ContentType::podcast(),
            status,
            published_at: datetime!(2024-03-10 09:00 UTC),
            attributes,
        }
    }

    #[test]
    fn default_statuses_are_published_only() {
        let query = ContentQuery::podcast();
        assert!(query.matches(&episode(ContentStatus::Published, None)));
        assert!(!query.matches(&episode(ContentStatus::Private, None)));
    }

    #[test]
    fn visibility_widens_statuses_and_bounds_standard_requesters() {
        let mut query = ContentQuery::podcast();
        let filter = compute_filter(
            PermissionLevel::Standard,
            datetime!(2024-03-09 12:00 UTC),
            Tz::UTC,
        );
        query.apply_visibility(&filter);

        assert!(query.matches(&episode(ContentStatus::Private, None)));
        assert_eq!(
            query.published_before.map(|bound| bound.date()),
            Some(date!(2024 - 03 - 10))
        );
        // Published at 09:00 on the 10th, which is not before the bound.
        assert!(!query.matches(&episode(ContentStatus::Published, None)));
    }

    #[test]
    fn administrator_filter_keeps_existing_bound() {
        let mut query = ContentQuery::podcast();
        let standard = compute_filter(
            PermissionLevel::Standard,
            datetime!(2024-03-09 12:00 UTC),
            Tz::UTC,
        );
        query.apply_visibility(&standard);
        let admin = compute_filter(
            PermissionLevel::Administrator,
            datetime!(2024-03-09 12:00 UTC),
            Tz::UTC,
        );
        query.apply_visibility(&admin);

        assert!(query.published_before.is_some());
    }

    #[test]
    fn attribute_constraints_are_deduplicated_and_enforced() {
        let mut query = ContentQuery::podcast();
        query.require_attribute("audio_file");
        query.require_attribute("audio_file");
        assert_eq!(query.attribute_constraints.len(), 1);

        assert!(query.matches(&episode(ContentStatus::Published, Some("ep.mp3"))));
        assert!(!query.matches(&episode(ContentStatus::Published, Some(""))));
        assert!(!query.matches(&episode(ContentStatus::Published, None)));
    }

    #[test]
    fn targets_only_requires_a_single_type() {
        let mut query = ContentQuery::podcast();
        assert!(query.targets_only("podcast"));

        query
            .content_types
            .insert(ContentType::new("post").expect("valid type"));
        assert!(!query.targets_only("podcast"));
    }
}
