//! Macro visibility registry
//!
//! Records, for one translation unit, the directive sets of every header
//! reached so far in include order. Later entries are closer to the point of
//! use, so lookups scan from the back.

use hdrtrace_core::{HeaderId, IncludeDirectives, MacroDefinition};
use indexmap::IndexMap;
use std::sync::Arc;

/// Ordered map from header to its directive set
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    visible: IndexMap<HeaderId, Arc<IncludeDirectives>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the directive set of a header that has just been included.
    ///
    /// Sets that define no macros are not stored. A header that is already
    /// present keeps its first set; re-including a guarded header changes
    /// nothing.
    pub fn append(&mut self, header: HeaderId, directives: Arc<IncludeDirectives>) {
        if !directives.has_macros() {
            return;
        }
        self.visible.entry(header).or_insert(directives);
    }

    /// Merge a finished registry into this one.
    ///
    /// Unlike [`MacroRegistry::append`], entries from `other` replace entries
    /// for the same header here. A replaced entry keeps its position.
    pub fn append_all(&mut self, other: &MacroRegistry) {
        for (header, directives) in &other.visible {
            self.visible.insert(header.clone(), directives.clone());
        }
    }

    /// Registered directive sets in insertion order
    pub fn header_directive_sets(
        &self,
    ) -> impl DoubleEndedIterator<Item = &IncludeDirectives> + ExactSizeIterator {
        self.visible.values().map(|d| d.as_ref())
    }

    /// Registered headers in insertion order
    pub fn headers(&self) -> impl Iterator<Item = &HeaderId> {
        self.visible.keys()
    }

    /// Most recently registered definitions of `name`, with the header that
    /// holds them
    pub fn lookup(&self, name: &str) -> Option<(&HeaderId, &[MacroDefinition])> {
        self.visible
            .iter()
            .rev()
            .find(|(_, directives)| directives.is_defined(name))
            .map(|(header, directives)| (header, directives.definitions(name)))
    }

    pub fn get(&self, header: &HeaderId) -> Option<&Arc<IncludeDirectives>> {
        self.visible.get(header)
    }

    pub fn contains(&self, header: &HeaderId) -> bool {
        self.visible.contains_key(header)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
