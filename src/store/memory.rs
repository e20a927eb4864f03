//! In-memory store implementation for tests and the demo binary.
//!
//! `HashMap`s behind `std::sync::RwLock`; mention IDs come from a process-wide
//! counter. Not durable, by design.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use url::Url;

use crate::types::{MentionId, PersistedMention, ReconcileResult, TargetKey};

use super::{AppliedCounts, MentionStore, Post, PostStore, StoreError};

/// In-memory post + mention store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Path -> post, with one entry per alias path.
    posts: RwLock<HashMap<String, Post>>,
    mentions: RwLock<HashMap<TargetKey, Vec<PersistedMention>>>,
    next_mention_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            posts: RwLock::new(HashMap::new()),
            mentions: RwLock::new(HashMap::new()),
            next_mention_id: AtomicU64::new(1),
        }
    }

    /// Registers a post under all of its alias paths.
    pub fn add_post(&self, post: Post) {
        let mut posts = self.posts.write().unwrap();
        for path in post.alias_paths() {
            posts.insert(path.to_string(), post.clone());
        }
    }

    fn fresh_id(&self) -> MentionId {
        MentionId(self.next_mention_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.read().unwrap().get(path).cloned())
    }
}

#[async_trait]
impl MentionStore for MemoryStore {
    async fn list_for_target(
        &self,
        target: TargetKey,
    ) -> Result<Vec<PersistedMention>, StoreError> {
        Ok(self
            .mentions
            .read()
            .unwrap()
            .get(&target)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply(
        &self,
        target: TargetKey,
        result: &ReconcileResult,
    ) -> Result<AppliedCounts, StoreError> {
        let mut counts = AppliedCounts::default();
        let mut mentions = self.mentions.write().unwrap();
        let slot = mentions.entry(target).or_default();

        for (id, candidate) in &result.to_update {
            if let Some(existing) = slot.iter_mut().find(|m| m.id == *id) {
                existing.candidate = candidate.clone();
                existing.deleted = false;
                counts.updated += 1;
            }
        }

        for id in &result.to_mark_deleted {
            if let Some(existing) = slot.iter_mut().find(|m| m.id == *id) {
                if !existing.deleted {
                    existing.deleted = true;
                    counts.deleted += 1;
                }
            }
        }

        for candidate in &result.to_create {
            slot.push(PersistedMention {
                id: self.fresh_id(),
                candidate: candidate.clone(),
                deleted: false,
            });
            counts.created += 1;
        }

        Ok(counts)
    }

    async fn find_by_source(
        &self,
        target: TargetKey,
        source: &Url,
    ) -> Result<Vec<PersistedMention>, StoreError> {
        Ok(self
            .mentions
            .read()
            .unwrap()
            .get(&target)
            .map(|slot| {
                slot.iter()
                    .filter(|m| &m.candidate.source_url == source)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MentionCandidate, PostId, RefType};
    use chrono::Utc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn candidate(source: &str) -> MentionCandidate {
        MentionCandidate::bare(url(source), RefType::Reply, Utc::now())
    }

    #[tokio::test]
    async fn post_lookup_covers_all_aliases() {
        let store = MemoryStore::new();
        store.add_post(
            Post::new(PostId(1), "/note/2020/01/05/a1")
                .with_short_path("/n/Ab3x")
                .with_historic_path("/old/a1"),
        );

        for path in ["/note/2020/01/05/a1", "/n/Ab3x", "/old/a1"] {
            let found = store.find_by_path(path).await.unwrap().unwrap();
            assert_eq!(found.id, PostId(1));
        }
        assert!(store.find_by_path("/nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = MemoryStore::new();
        let target = TargetKey::Post(PostId(1));

        let result = ReconcileResult {
            to_create: vec![candidate("https://a.example/1"), candidate("https://a.example/2")],
            ..Default::default()
        };
        let counts = store.apply(target, &result).await.unwrap();
        assert_eq!(counts.created, 2);

        let stored = store.list_for_target(target).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn update_resurrects_tombstone() {
        let store = MemoryStore::new();
        let target = TargetKey::Post(PostId(1));

        let create = ReconcileResult {
            to_create: vec![candidate("https://a.example/1")],
            ..Default::default()
        };
        store.apply(target, &create).await.unwrap();
        let id = store.list_for_target(target).await.unwrap()[0].id;

        let delete = ReconcileResult {
            to_mark_deleted: vec![id],
            ..Default::default()
        };
        let counts = store.apply(target, &delete).await.unwrap();
        assert_eq!(counts.deleted, 1);
        assert!(store.list_for_target(target).await.unwrap()[0].deleted);

        // Deleting again is a no-op.
        let counts = store.apply(target, &delete).await.unwrap();
        assert_eq!(counts.deleted, 0);

        let update = ReconcileResult {
            to_update: vec![(id, candidate("https://a.example/1"))],
            ..Default::default()
        };
        let counts = store.apply(target, &update).await.unwrap();
        assert_eq!(counts.updated, 1);
        assert!(!store.list_for_target(target).await.unwrap()[0].deleted);
    }

    #[tokio::test]
    async fn find_by_source_matches_exact_url() {
        let store = MemoryStore::new();
        let target = TargetKey::Post(PostId(1));
        let create = ReconcileResult {
            to_create: vec![candidate("https://a.example/1")],
            ..Default::default()
        };
        store.apply(target, &create).await.unwrap();

        let hits = store
            .find_by_source(target, &url("https://a.example/1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        // Scheme variants are distinct identities at the store layer.
        let misses = store
            .find_by_source(target, &url("http://a.example/1"))
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn targets_are_independent() {
        let store = MemoryStore::new();
        let create = ReconcileResult {
            to_create: vec![candidate("https://a.example/1")],
            ..Default::default()
        };
        store.apply(TargetKey::Post(PostId(1)), &create).await.unwrap();
        store.apply(TargetKey::Domain, &create).await.unwrap();

        assert_eq!(
            store.list_for_target(TargetKey::Post(PostId(1))).await.unwrap().len(),
            1
        );
        assert_eq!(store.list_for_target(TargetKey::Domain).await.unwrap().len(), 1);
        assert!(store
            .list_for_target(TargetKey::Post(PostId(2)))
            .await
            .unwrap()
            .is_empty());
    }
}
