//! Persistence capabilities.
//!
//! The post store and mention store are external collaborators. The engine
//! consumes them through dyn-safe traits; [`memory::MemoryStore`] implements
//! both for tests and the demo binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::types::{PersistedMention, PostId, ReconcileResult, TargetKey};

pub mod memory;

pub use memory::MemoryStore;

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A content object that can receive mentions.
///
/// Paths are site-relative (`/note/2020/01/05/a1`); the resolver joins them
/// onto the site base URL to build the accepted alias set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,

    /// Canonical permalink path.
    pub canonical_path: String,

    /// Canonical path without the trailing slug segment, when the canonical
    /// form carries one.
    pub slugless_path: Option<String>,

    /// Short permalink path, e.g. `/n/Ab3x`.
    pub short_path: Option<String>,

    /// Paths the post lived at earlier in its life.
    pub historic_paths: Vec<String>,

    /// Permanently removed. A matched route to a gone post resolves to
    /// `Unresolved(PostGone)`.
    pub gone: bool,
}

impl Post {
    pub fn new(id: PostId, canonical_path: impl Into<String>) -> Self {
        Post {
            id,
            canonical_path: canonical_path.into(),
            slugless_path: None,
            short_path: None,
            historic_paths: Vec::new(),
            gone: false,
        }
    }

    pub fn with_short_path(mut self, path: impl Into<String>) -> Self {
        self.short_path = Some(path.into());
        self
    }

    pub fn with_slugless_path(mut self, path: impl Into<String>) -> Self {
        self.slugless_path = Some(path.into());
        self
    }

    pub fn with_historic_path(mut self, path: impl Into<String>) -> Self {
        self.historic_paths.push(path.into());
        self
    }

    pub fn mark_gone(mut self) -> Self {
        self.gone = true;
        self
    }

    /// Every path this post answers to, canonical first.
    pub fn alias_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.canonical_path.as_str()];
        paths.extend(self.slugless_path.as_deref());
        paths.extend(self.short_path.as_deref());
        paths.extend(self.historic_paths.iter().map(String::as_str));
        paths
    }
}

/// Read-only lookup into the site's post store.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Finds the post that answers to a site-relative path (canonical,
    /// slug-less, short, or historic).
    async fn find_by_path(&self, path: &str) -> Result<Option<Post>, StoreError>;
}

/// Counts actually applied by the mention store.
///
/// `deleted` counts tombstone flips only; marking an already-deleted mention
/// deleted again is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Mention persistence for one site.
///
/// Implementations must apply a [`ReconcileResult`] atomically with respect
/// to other writers of the same target; the engine additionally serializes
/// claims per target, so a single-writer guarantee per key is sufficient.
#[async_trait]
pub trait MentionStore: Send + Sync {
    /// All stored mentions for a target, tombstones included.
    async fn list_for_target(&self, target: TargetKey) -> Result<Vec<PersistedMention>, StoreError>;

    /// Applies creates, updates, and tombstone flags for one target.
    ///
    /// Updates replace every candidate field and clear the `deleted` flag:
    /// a re-delivered source that verifies again resurrects its tombstoned
    /// mention.
    async fn apply(
        &self,
        target: TargetKey,
        result: &ReconcileResult,
    ) -> Result<AppliedCounts, StoreError>;

    /// The ids of live-or-tombstoned mentions for `target` whose identity
    /// source is `source`, compared exactly as delivered.
    async fn find_by_source(
        &self,
        target: TargetKey,
        source: &Url,
    ) -> Result<Vec<PersistedMention>, StoreError>;
}
