//! In-memory content store backed by a TOML fixture.
//!
//! ```toml
//! [[items]]
//! id = 42
//! type = "podcast"
//! status = "private"
//! published_at = "2024-03-01T09:00:00Z"
//! attributes = { audio_file = "https://cdn.example/ep42.mp3" }
//! ```

use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::InfraError;
use crate::application::listeners::QueryListeners;
use crate::application::repos::{ContentQuery, ContentStore, RepoError};
use crate::cache::ContentChange;
use crate::domain::entities::{ContentItem, ContentItemId};

#[derive(Debug, Deserialize)]
struct ContentFixture {
    #[serde(default)]
    items: Vec<ContentItem>,
}

#[derive(Default)]
pub struct InMemoryContentStore {
    items: RwLock<Vec<ContentItem>>,
    listeners: QueryListeners,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
            listeners: QueryListeners::new(),
        }
    }

    pub fn from_toml_str(data: &str) -> Result<Self, InfraError> {
        let fixture: ContentFixture = toml::from_str(data)
            .map_err(|err| InfraError::fixture(format!("failed to parse content fixture: {err}")))?;
        Ok(Self::from_items(fixture.items))
    }

    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let data = fs::read_to_string(path)?;
        let store = Self::from_toml_str(&data).map_err(|err| match err {
            InfraError::Fixture { message } => {
                InfraError::fixture(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        info!(path = %path.display(), items = store.len(), "Loaded content fixture");
        Ok(store)
    }

    pub fn with_listeners(mut self, listeners: QueryListeners) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn len(&self) -> usize {
        self.read_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_items().is_empty()
    }

    /// Inserts or replaces the item with the same id.
    pub fn upsert(&self, item: ContentItem) -> ContentChange {
        let mut items = self.write_items();
        let change = match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                let change = ContentChange::updated(item.id, item.content_type.clone());
                *existing = item;
                change
            }
            None => {
                let change = ContentChange::created(item.id, item.content_type.clone());
                items.push(item);
                change
            }
        };
        debug!(item_id = %change.item_id, kind = change.kind.as_str(), "Content item stored");
        change
    }

    pub fn remove(&self, id: ContentItemId) -> Option<ContentChange> {
        let mut items = self.write_items();
        let position = items.iter().position(|item| item.id == id)?;
        let removed = items.remove(position);
        Some(ContentChange::deleted(removed.id, removed.content_type))
    }

    fn read_items(&self) -> RwLockReadGuard<'_, Vec<ContentItem>> {
        self.items.read().unwrap_or_else(|poisoned| {
            warn!(
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned content store lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }

    fn write_items(&self) -> RwLockWriteGuard<'_, Vec<ContentItem>> {
        self.items.write().unwrap_or_else(|poisoned| {
            warn!(
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned content store lock"
            );
            PoisonError::into_inner(poisoned)
        })
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn query_ids(&self, query: &ContentQuery) -> Result<Vec<ContentItemId>, RepoError> {
        let mut query = query.clone();
        self.listeners.apply(&mut query);

        if query.content_types.is_empty() {
            return Err(RepoError::InvalidQuery {
                message: "query must name at least one content type".to_string(),
            });
        }

        let items = self.read_items();
        let mut matched: Vec<&ContentItem> = items.iter().filter(|item| query.matches(item)).collect();
        matched.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let limit = query.limit.map_or(usize::MAX, |limit| limit.get());
        Ok(matched.into_iter().take(limit).map(|item| item.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use super::*;
    use crate::application::listeners::{PostTypeExpansion, with_expansion_suppressed};
    use crate::cache::ChangeKind;
    use crate::domain::types::{ContentStatus, ContentType};

    const FIXTURE: &str = r#"
[[items]]
id = 1
type = "podcast"
status = "published"
published_at = "2024-03-01T09:00:00Z"

[[items]]
id = 2
type = "podcast"
status = "private"
published_at = "2024-03-05T09:00:00Z"

[[items]]
id = 3
type = "post"
status = "published"
published_at = "2024-03-06T09:00:00Z"
attributes = { audio_file = "https://cdn.example/3.mp3" }

[[items]]
id = 4
type = "podcast"
status = "draft"
published_at = "2024-03-07T09:00:00Z"
"#;

    fn store() -> InMemoryContentStore {
        InMemoryContentStore::from_toml_str(FIXTURE).expect("fixture parses")
    }

    fn ids(values: &[u64]) -> Vec<ContentItemId> {
        values.iter().copied().map(ContentItemId).collect()
    }

    #[tokio::test]
    async fn results_are_newest_first() {
        let mut query = ContentQuery::podcast();
        query.statuses = Some(BTreeSet::from([
            ContentStatus::Published,
            ContentStatus::Private,
        ]));

        let found = store().query_ids(&query).await.expect("query");
        assert_eq!(found, ids(&[2, 1]));
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let mut query = ContentQuery::podcast();
        query.statuses = Some(BTreeSet::from([
            ContentStatus::Published,
            ContentStatus::Private,
            ContentStatus::Draft,
        ]));
        query.limit = NonZeroUsize::new(2);

        let found = store().query_ids(&query).await.expect("query");
        assert_eq!(found, ids(&[4, 2]));
    }

    #[tokio::test]
    async fn expansion_listener_runs_unless_suppressed() {
        let store = store().with_listeners(QueryListeners::new().with(Arc::new(
            PostTypeExpansion::new([ContentType::new("post").expect("valid type")]),
        )));
        let query = ContentQuery::podcast();

        let expanded = store.query_ids(&query).await.expect("query");
        assert_eq!(expanded, ids(&[3, 1]));

        let suppressed = with_expansion_suppressed(store.query_ids(&query))
            .await
            .expect("query");
        assert_eq!(suppressed, ids(&[1]));
    }

    #[tokio::test]
    async fn empty_type_set_is_rejected() {
        let query = ContentQuery::for_types(Vec::<ContentType>::new());
        assert!(matches!(
            store().query_ids(&query).await,
            Err(RepoError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn upsert_and_remove_report_changes() {
        let store = store();
        let mut item = store.read_items()[0].clone();
        item.status = ContentStatus::Private;

        assert_eq!(store.upsert(item.clone()).kind, ChangeKind::Updated);
        item.id = ContentItemId(9);
        assert_eq!(store.upsert(item).kind, ChangeKind::Created);
        assert_eq!(store.len(), 5);

        let removed = store.remove(ContentItemId(9)).expect("removed");
        assert_eq!(removed.kind, ChangeKind::Deleted);
        assert!(store.remove(ContentItemId(9)).is_none());
    }

    #[test]
    fn malformed_fixture_is_reported() {
        let err = InMemoryContentStore::from_toml_str("[[items]]\nid = \"x\"")
            .err()
            .expect("invalid fixture");
        assert!(matches!(err, InfraError::Fixture { .. }));
    }

    #[test]
    fn fixture_file_loads_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("content.toml");
        fs::write(&path, FIXTURE).expect("write fixture");

        let store = InMemoryContentStore::load(&path).expect("load");
        assert_eq!(store.len(), 4);
    }
}
