//! Shared header summaries
//!
//! Most headers are reached from many translation units. When nothing below
//! a header names its include through a macro, what it pulls in cannot
//! depend on the including context, so its subtree is traversed once with a
//! fresh registry and the finished result is spliced into every later
//! traversal with [`MacroRegistry::append_all`].

use hdrtrace_core::{HeaderId, Result};
use hdrtrace_parser::DirectiveProvider;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::graph::{fetch_directives, Reached};
use crate::locator::FileLocator;
use crate::registry::MacroRegistry;
use crate::resolver::IncludeResolver;

/// Finished traversal of one context-independent header
#[derive(Debug, Clone, Default)]
pub struct HeaderSummary {
    /// Macros made visible by including the header
    pub registry: MacroRegistry,
    /// Everything below the header, the header itself included
    pub reached: Reached,
}

#[derive(Debug, Clone)]
enum Summary {
    Independent(Arc<HeaderSummary>),
    /// Its subtree contains a macro include or an include cycle
    Dependent,
}

impl Summary {
    fn independent(&self) -> Option<Arc<HeaderSummary>> {
        match self {
            Summary::Independent(summary) => Some(summary.clone()),
            Summary::Dependent => None,
        }
    }
}

/// Thread-safe store of header summaries
#[derive(Default)]
pub struct SummaryCache {
    entries: RwLock<HashMap<HeaderId, Summary>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of `header`, computing it on first request.
    ///
    /// `None` means the header must be traversed in context.
    pub fn summarize<P: DirectiveProvider, L: FileLocator>(
        &self,
        header: &HeaderId,
        provider: &P,
        resolver: &IncludeResolver<L>,
    ) -> Result<Option<Arc<HeaderSummary>>> {
        let mut in_progress = HashSet::new();
        self.summarize_inner(header, provider, resolver, &mut in_progress)
    }

    /// Cached summary without computing one
    pub fn get(&self, header: &HeaderId) -> Option<Arc<HeaderSummary>> {
        self.lookup(header).and_then(|s| s.independent())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> SummaryStats {
        let mut stats = SummaryStats::default();
        if let Ok(entries) = self.entries.read() {
            for summary in entries.values() {
                match summary {
                    Summary::Independent(_) => stats.independent += 1,
                    Summary::Dependent => stats.dependent += 1,
                }
            }
        }
        stats
    }

    fn summarize_inner<P: DirectiveProvider, L: FileLocator>(
        &self,
        header: &HeaderId,
        provider: &P,
        resolver: &IncludeResolver<L>,
        in_progress: &mut HashSet<HeaderId>,
    ) -> Result<Option<Arc<HeaderSummary>>> {
        if let Some(summary) = self.lookup(header) {
            return Ok(summary.independent());
        }
        if !in_progress.insert(header.clone()) {
            return Ok(None);
        }

        let computed = self.compute(header, provider, resolver, in_progress);
        in_progress.remove(header);
        let computed = computed?;

        Ok(self.publish(header, computed).independent())
    }

    fn compute<P: DirectiveProvider, L: FileLocator>(
        &self,
        header: &HeaderId,
        provider: &P,
        resolver: &IncludeResolver<L>,
        in_progress: &mut HashSet<HeaderId>,
    ) -> Result<Summary> {
        let directives = fetch_directives(provider, header)?;
        if directives.has_macro_includes() {
            return Ok(Summary::Dependent);
        }

        let mut summary = HeaderSummary::default();
        summary.registry.append(header.clone(), directives.clone());
        summary.reached.headers.insert(header.clone());

        for include in directives.includes() {
            let resolution = resolver.resolve(&summary.registry, include, header);
            for target in summary.reached.record(header, include, resolution) {
                match self.summarize_inner(&target, provider, resolver, in_progress)? {
                    Some(child) => {
                        summary.registry.append_all(&child.registry);
                        summary.reached.absorb(&child.reached);
                    }
                    None => return Ok(Summary::Dependent),
                }
            }
        }

        Ok(Summary::Independent(Arc::new(summary)))
    }

    fn lookup(&self, header: &HeaderId) -> Option<Summary> {
        self.entries.read().ok()?.get(header).cloned()
    }

    /// Store a finished summary. If another worker got there first, its
    /// entry stays and is returned.
    fn publish(&self, header: &HeaderId, summary: Summary) -> Summary {
        match self.entries.write() {
            Ok(mut entries) => {
                let stored = entries.entry(header.clone()).or_insert_with(|| {
                    debug!("Summarized {}", header);
                    summary
                });
                stored.clone()
            }
            Err(_) => summary,
        }
    }
}

/// Summary cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub independent: usize,
    pub dependent: usize,
}
