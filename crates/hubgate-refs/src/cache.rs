//! Bounded cache of resolved tree hashes.
//!
//! The resolver itself never caches. [`TreeCache`] is an opt-in component
//! the server consults around [`RefResolver::resolve_tree`](crate::RefResolver::resolve_tree):
//! entries are keyed by `(owner, repo, ref)`, expire after a fixed TTL, are
//! evicted least-recently-used beyond the capacity, and are dropped for a
//! whole repository when a push arrives.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hubgate_types::{RepositoryCoordinate, TreeHash};
use lru::LruCache;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    owner: String,
    repo: String,
    reference: String,
}

impl CacheKey {
    fn new(coordinate: &RepositoryCoordinate, reference: &str) -> Self {
        Self {
            owner: coordinate.owner.clone(),
            repo: coordinate.name.clone(),
            reference: reference.to_string(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    tree: TreeHash,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct TreeCache {
    entries: Mutex<LruCache<CacheKey, Entry>>,
    ttl: Duration,
}

impl TreeCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached tree for `reference`, if present and younger than the TTL.
    pub fn get(&self, coordinate: &RepositoryCoordinate, reference: &str) -> Option<TreeHash> {
        let key = CacheKey::new(coordinate, reference);
        let mut entries = self.lock();
        let fresh = entries.get(&key).map(|e| e.stored_at.elapsed() < self.ttl)?;
        if fresh {
            entries.get(&key).map(|e| e.tree.clone())
        } else {
            entries.pop(&key);
            None
        }
    }

    pub fn insert(&self, coordinate: &RepositoryCoordinate, reference: &str, tree: TreeHash) {
        self.lock().put(
            CacheKey::new(coordinate, reference),
            Entry {
                tree,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry for `coordinate`. Returns how many were removed.
    pub fn invalidate_repository(&self, coordinate: &RepositoryCoordinate) -> usize {
        let mut entries = self.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(k, _)| k.owner == coordinate.owner && k.repo == coordinate.name)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are plain values; a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
