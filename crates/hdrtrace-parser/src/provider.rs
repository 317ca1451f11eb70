//! Directive providers

use crate::cache::{hash_content, CacheStats, DirectiveCache};
use crate::scanner::DirectiveScanner;
use crate::DirectiveProvider;
use hdrtrace_core::{Error, HeaderId, IncludeDirectives, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Provider that scans files from disk, caching by content hash
pub struct FileDirectiveProvider {
    scanner: DirectiveScanner,
    cache: DirectiveCache,
}

impl FileDirectiveProvider {
    pub fn new() -> Self {
        Self::with_cache_capacity(1024)
    }

    /// Create with custom cache capacity
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            scanner: DirectiveScanner::new(),
            cache: DirectiveCache::new(capacity),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop the cached set of a header
    pub fn invalidate(&self, header: &HeaderId) {
        self.cache.invalidate(header);
    }
}

impl Default for FileDirectiveProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveProvider for FileDirectiveProvider {
    fn directives(&self, header: &HeaderId) -> Result<Arc<IncludeDirectives>> {
        let source = match std::fs::read(header.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(header.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let hash = hash_content(&source);

        if let Some(cached) = self.cache.get(header, hash) {
            debug!("Cache hit for {}", header);
            return Ok(cached);
        }

        debug!("Scanning {}", header);
        let directives = Arc::new(self.scanner.scan(&source));
        self.cache.insert(header.clone(), hash, directives.clone());
        Ok(directives)
    }
}

/// Provider over directive sets held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: HashMap<HeaderId, Arc<IncludeDirectives>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the directive set of a header, replacing any previous one
    pub fn insert(&mut self, header: impl Into<HeaderId>, directives: IncludeDirectives) {
        self.files.insert(header.into(), Arc::new(directives));
    }

    /// Builder-style [`MemoryProvider::insert`]
    pub fn with(mut self, header: impl Into<HeaderId>, directives: IncludeDirectives) -> Self {
        self.insert(header, directives);
        self
    }

    /// Scan `source` and register the result
    pub fn insert_source(&mut self, header: impl Into<HeaderId>, source: &str) {
        self.insert(header, DirectiveScanner::new().scan(source));
    }

    pub fn contains(&self, header: &HeaderId) -> bool {
        self.files.contains_key(header)
    }

    /// Registered headers, in no particular order
    pub fn headers(&self) -> impl Iterator<Item = &HeaderId> {
        self.files.keys()
    }
}

impl DirectiveProvider for MemoryProvider {
    fn directives(&self, header: &HeaderId) -> Result<Arc<IncludeDirectives>> {
        self.files
            .get(header)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(header.to_string()))
    }
}
