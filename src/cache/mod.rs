// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-addressed render cache.
//!
//! Strict LRU with a fixed capacity set at construction. Keys are
//! `{path}:{hex(sha256(content))}`, which keeps the cache correct under
//! file renames (different key, safe re-render) and under external edits
//! that restore prior content (same key, valid hit). Theme-aware
//! backend/type pairs append the theme so a light render is never served
//! for a dark preview.
//!
//! Error results are refused by the cache itself rather than by caller
//! discipline: failures are not memoized, so a transient fault retries on
//! the next edit.

use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::render::{RenderResult, Theme};

/// Build the content-addressed key for a render of `content` at `path`.
pub fn cache_key(path: &Path, content: &str) -> String {
    format!(
        "{}:{}",
        path.display(),
        hex::encode(Sha256::digest(content.as_bytes()))
    )
}

/// Key variant for theme-aware backends; the theme becomes part of the
/// identity so both themes can coexist in the cache.
pub fn themed_cache_key(path: &Path, content: &str, theme: Theme) -> String {
    format!("{}:{}", cache_key(path, content), theme.as_str())
}

/// LRU store of `cache key -> RenderResult`.
///
/// `get` on a hit moves the key to the most-recently-used position.
/// `set` on an existing key updates the value and refreshes recency.
/// Insertion beyond capacity evicts exactly the least-recently-used
/// entry; the configured capacity is never exceeded.
pub struct RenderCache {
    entries: LruCache<String, RenderResult>,
}

impl RenderCache {
    /// Create a cache with the given capacity. A capacity of zero is
    /// clamped to one: a cache that cannot hold anything would turn every
    /// preview into a fresh render.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<RenderResult> {
        self.entries.get(key).cloned()
    }

    pub fn set(&mut self, key: String, result: RenderResult) {
        if result.is_error() {
            return;
        }
        self.entries.put(key, result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
