//! LRU cache for scanned directive sets
//!
//! Entries are keyed by header and validated against the content hash of the
//! file they were scanned from, so an edited header is rescanned.

use hdrtrace_core::{HeaderId, IncludeDirectives};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

struct Cached {
    content_hash: u64,
    directives: Arc<IncludeDirectives>,
}

/// Bounded cache of directive sets.
///
/// Recency is the position in the map: a hit moves the entry to the back and
/// eviction takes the front.
pub struct DirectiveCache {
    capacity: usize,
    entries: Mutex<IndexMap<HeaderId, Cached>>,
}

impl DirectiveCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    /// Directive set of `header` if it was scanned from content with this
    /// hash. A stale entry is dropped.
    pub fn get(&self, header: &HeaderId, content_hash: u64) -> Option<Arc<IncludeDirectives>> {
        let mut entries = self.entries.lock().ok()?;
        let cached = entries.shift_remove(header)?;
        if cached.content_hash != content_hash {
            return None;
        }
        let directives = cached.directives.clone();
        entries.insert(header.clone(), cached);
        Some(directives)
    }

    pub fn insert(&self, header: HeaderId, content_hash: u64, directives: Arc<IncludeDirectives>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.shift_remove(&header);
        while entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(
            header,
            Cached {
                content_hash,
                directives,
            },
        );
    }

    pub fn invalidate(&self, header: &HeaderId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.shift_remove(header);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().map(|e| e.len()).unwrap_or(0),
            capacity: self.capacity,
        }
    }
}

impl Default for DirectiveCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
}

/// Hash file content for change detection
pub fn hash_content(content: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}
