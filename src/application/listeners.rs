//! Pre-query listeners run by content stores before matching.
//!
//! [`PostTypeExpansion`] widens podcast queries to every configured podcast
//! post type. The episode lister builds its own type list, so it runs its
//! store query inside [`with_expansion_suppressed`]. The flag lives in task-local
//! storage: it covers only the wrapped future and is gone once that future
//! finishes, errors, or is dropped.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use super::repos::ContentQuery;
use crate::domain::types::ContentType;

tokio::task_local! {
    static EXPANSION_SUPPRESSED: bool;
}

/// Runs `future` with post-type expansion switched off.
pub async fn with_expansion_suppressed<F>(future: F) -> F::Output
where
    F: Future,
{
    EXPANSION_SUPPRESSED.scope(true, future).await
}

/// Whether the current task is inside [`with_expansion_suppressed`].
pub fn expansion_suppressed() -> bool {
    EXPANSION_SUPPRESSED.try_with(|flag| *flag).unwrap_or(false)
}

pub trait QueryListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn before_query(&self, query: &mut ContentQuery);
}

/// Adds the configured podcast post types to any query that targets `podcast`.
#[derive(Debug, Clone, Default)]
pub struct PostTypeExpansion {
    post_types: BTreeSet<ContentType>,
}

impl PostTypeExpansion {
    pub fn new(post_types: impl IntoIterator<Item = ContentType>) -> Self {
        Self {
            post_types: post_types.into_iter().collect(),
        }
    }
}

impl QueryListener for PostTypeExpansion {
    fn name(&self) -> &'static str {
        "post_type_expansion"
    }

    fn before_query(&self, query: &mut ContentQuery) {
        if expansion_suppressed() {
            trace!(listener = self.name(), "Listener suppressed");
            return;
        }
        if !query.content_types.iter().any(ContentType::is_podcast) {
            return;
        }
        query.content_types.extend(self.post_types.iter().cloned());
    }
}

#[derive(Clone, Default)]
pub struct QueryListeners {
    listeners: Vec<Arc<dyn QueryListener>>,
}

impl QueryListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn QueryListener>) {
        self.listeners.push(listener);
    }

    pub fn with(mut self, listener: Arc<dyn QueryListener>) -> Self {
        self.register(listener);
        self
    }

    pub fn apply(&self, query: &mut ContentQuery) {
        for listener in &self.listeners {
            listener.before_query(query);
        }
    }
}
