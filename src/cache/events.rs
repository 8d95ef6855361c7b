//! Content change events that invalidate cached episode lists.

use time::OffsetDateTime;

use crate::domain::entities::ContentItemId;
use crate::domain::types::ContentType;

/// What happened to a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub kind: ChangeKind,
    pub item_id: ContentItemId,
    pub content_type: ContentType,
    pub observed_at: OffsetDateTime,
}

impl ContentChange {
    pub fn new(kind: ChangeKind, item_id: ContentItemId, content_type: ContentType) -> Self {
        Self {
            kind,
            item_id,
            content_type,
            observed_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(item_id: ContentItemId, content_type: ContentType) -> Self {
        Self::new(ChangeKind::Created, item_id, content_type)
    }

    pub fn updated(item_id: ContentItemId, content_type: ContentType) -> Self {
        Self::new(ChangeKind::Updated, item_id, content_type)
    }

    pub fn deleted(item_id: ContentItemId, content_type: ContentType) -> Self {
        Self::new(ChangeKind::Deleted, item_id, content_type)
    }
}
