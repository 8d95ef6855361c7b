//! Extension points around the episode query.
//!
//! Other components register an [`EpisodeQueryHook`] to rename the audio
//! attribute, add content types to the feed, or append constraints before the
//! query runs. Hooks run in registration order; each sees the previous result.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::repos::ContentQuery;
use crate::domain::types::ContentType;

/// Attribute that marks an item as carrying audio.
pub const DEFAULT_AUDIO_ATTRIBUTE_KEY: &str = "audio_file";

pub trait EpisodeQueryHook: Send + Sync {
    /// Replacement for the audio attribute key, given the current one.
    fn audio_attribute_key(&self, _current: &str) -> Option<String> {
        None
    }

    /// Extra content types to include alongside `podcast`.
    fn additional_content_types(&self) -> BTreeSet<ContentType> {
        BTreeSet::new()
    }

    /// Last chance to adjust the query before it is executed.
    fn extend_query(&self, _query: &mut ContentQuery) {}
}

#[derive(Clone, Default)]
pub struct EpisodeHooks {
    hooks: Vec<Arc<dyn EpisodeQueryHook>>,
}

impl EpisodeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn EpisodeQueryHook>) {
        self.hooks.push(hook);
    }

    pub fn with(mut self, hook: Arc<dyn EpisodeQueryHook>) -> Self {
        self.register(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Resolves the audio attribute key, falling back to `audio_file` when blank.
    pub fn audio_attribute_key(&self, configured: &str) -> String {
        let resolved = self
            .hooks
            .iter()
            .fold(configured.to_string(), |current, hook| {
                hook.audio_attribute_key(&current).unwrap_or(current)
            });

        let trimmed = resolved.trim();
        if trimmed.is_empty() {
            warn!(
                configured,
                fallback = DEFAULT_AUDIO_ATTRIBUTE_KEY,
                "Blank audio attribute key; using default"
            );
            return DEFAULT_AUDIO_ATTRIBUTE_KEY.to_string();
        }
        trimmed.to_string()
    }

    pub fn additional_content_types(&self) -> BTreeSet<ContentType> {
        self.hooks
            .iter()
            .flat_map(|hook| hook.additional_content_types())
            .collect()
    }

    pub fn extend_query(&self, query: &mut ContentQuery) {
        for hook in &self.hooks {
            hook.extend_query(query);
        }
    }
}
