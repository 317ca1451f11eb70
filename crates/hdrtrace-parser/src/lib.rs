//! hdrtrace Parser
//!
//! Produces the directive set of each header: the macro definitions and
//! include statements the analysis works from.
//!
//! ## Modules
//!
//! - `scanner` - Line-oriented `#define` / `#include` extraction
//! - `cache` - LRU cache for scanned directive sets
//! - `provider` - Directive providers backed by files or memory

pub mod cache;
pub mod provider;
pub mod scanner;

pub use provider::{FileDirectiveProvider, MemoryProvider};
pub use scanner::DirectiveScanner;

use hdrtrace_core::{HeaderId, IncludeDirectives, Result};
use std::sync::Arc;

/// Source of directive sets.
///
/// Implementations must return the same set for the same file content.
pub trait DirectiveProvider: Send + Sync {
    /// Directive set of `header`
    fn directives(&self, header: &HeaderId) -> Result<Arc<IncludeDirectives>>;
}

impl<P: DirectiveProvider + ?Sized> DirectiveProvider for &P {
    fn directives(&self, header: &HeaderId) -> Result<Arc<IncludeDirectives>> {
        (**self).directives(header)
    }
}

impl<P: DirectiveProvider + ?Sized> DirectiveProvider for Arc<P> {
    fn directives(&self, header: &HeaderId) -> Result<Arc<IncludeDirectives>> {
        (**self).directives(header)
    }
}

/// Scan source text without going through a provider
pub fn scan_source(source: &str) -> IncludeDirectives {
    DirectiveScanner::new().scan(source)
}
