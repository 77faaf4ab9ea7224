//! Read-through container-title cache
//!
//! Scorers that compare an episode against its brand or series title resolve
//! the container through this cache. Entries expire a fixed time after they
//! were written. A TTL of zero disables storage entirely: every lookup goes
//! to the resolver, which keeps tests free of cross-test leakage.
//!
//! The cache is the only mutable state shared across item evaluations, so it
//! is backed by `DashMap` and safe for concurrent reads and writes. Expired
//! entries are dropped when a lookup finds them, and the map never holds
//! more than its capacity: a full cache first purges expired entries, then
//! evicts the oldest loads.

use crate::resolvers::ContentResolver;
use dashmap::DashMap;
use equiv_common::{Content, ContentKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default entry bound for [`ContainerTitleCache::new`]
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Resolved container (or its absence) and when it was loaded
#[derive(Debug, Clone)]
struct CachedContainer {
    container: Option<Arc<Content>>,
    loaded_at: Instant,
}

/// Thread-safe read-through cache of containers keyed by URI
pub struct ContainerTitleCache {
    resolver: Arc<dyn ContentResolver>,
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<String, CachedContainer>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContainerTitleCache {
    /// Create a cache in front of `resolver`
    ///
    /// # Arguments
    /// * `resolver` - Content store used on a miss
    /// * `ttl` - Expire-after-write duration; zero disables caching
    pub fn new(resolver: Arc<dyn ContentResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Bound the number of stored containers; at least one is kept
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Cache that always reads through
    pub fn disabled(resolver: Arc<dyn ContentResolver>) -> Self {
        Self::new(resolver, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Container at `uri`, loading it on a miss or expiry
    pub fn container(&self, uri: &str) -> Result<Option<Arc<Content>>> {
        if self.is_enabled() {
            // Clone out so no shard lock is held while calling the resolver
            let cached = self.entries.get(uri).map(|entry| entry.value().clone());
            if let Some(cached) = cached {
                if cached.loaded_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(cached.container);
                }
                // Another thread may have refreshed it meanwhile
                self.entries
                    .remove_if(uri, |_, entry| entry.loaded_at.elapsed() >= self.ttl);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let container = self
            .resolver
            .find_by_canonical_uris(&[uri.to_string()])?
            .remove(uri);
        debug!(container = %uri, found = container.is_some(), "Resolved container");

        if self.is_enabled() {
            if !self.entries.contains_key(uri) && self.entries.len() >= self.max_entries {
                self.make_room();
            }
            self.entries.insert(
                uri.to_string(),
                CachedContainer {
                    container: container.clone(),
                    loaded_at: Instant::now(),
                },
            );
        }
        Ok(container)
    }

    /// Purge expired entries, then evict the oldest loads until one slot is free
    fn make_room(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.loaded_at.elapsed() < ttl);

        let excess = (self.entries.len() + 1).saturating_sub(self.max_entries);
        if excess == 0 {
            return;
        }
        let mut oldest: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().loaded_at))
            .collect();
        oldest.sort_by_key(|(_, loaded_at)| *loaded_at);
        for (uri, _) in oldest.into_iter().take(excess) {
            self.entries.remove(&uri);
        }
        debug!(evicted = excess, capacity = self.max_entries, "Container cache full");
    }

    /// Title of the container at `uri`
    pub fn title(&self, uri: &str) -> Result<Option<String>> {
        Ok(self
            .container(uri)?
            .and_then(|c| c.title().map(str::to_string)))
    }

    /// Container at `uri`, following a series up to its parent brand
    ///
    /// Falls back to the series itself when the brand does not resolve.
    pub fn top_level_container(&self, uri: &str) -> Result<Option<Arc<Content>>> {
        let Some(container) = self.container(uri)? else {
            return Ok(None);
        };
        if container.kind == ContentKind::Series {
            if let Some(parent_uri) = &container.container_uri {
                if let Some(parent) = self.container(parent_uri)? {
                    return Ok(Some(parent));
                }
            }
        }
        Ok(Some(container))
    }

    /// Title of the top-level container of `content`, if it has one
    pub fn top_level_title(&self, content: &Content) -> Result<Option<String>> {
        let Some(uri) = content.container_uri.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .top_level_container(uri)?
            .and_then(|c| c.title().map(str::to_string)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}
