//! hdrtrace Analysis Engine
//!
//! Works out which headers a translation unit depends on when include
//! targets may be computed by macros:
//! - Macro visibility registry (which definitions an include can see)
//! - Macro include expansion and resolution
//! - Include graph construction with conservative completeness
//! - Shared summaries of context-independent headers
//! - Parallel analysis of many units

pub mod expand;
pub mod graph;
pub mod locator;
pub mod parallel;
pub mod registry;
pub mod resolver;
pub mod summary;

pub use graph::{GraphBuilder, IncludeEdge, IncludeGraph, IncludeIssue, IssueKind};
pub use locator::{FileLocator, SearchPath};
pub use parallel::{ParallelAnalyzer, ProgressEvent, ProgressPhase};
pub use registry::MacroRegistry;
pub use resolver::{IncludeResolver, Resolution, UnresolvedReason};
pub use summary::{HeaderSummary, SummaryCache, SummaryStats};

use hdrtrace_core::HeaderId;

/// Units that must be rebuilt after `changed` is modified.
///
/// Units with an incomplete graph are always listed.
pub fn affected_units<'a, I>(graphs: I, changed: &HeaderId) -> Vec<&'a HeaderId>
where
    I: IntoIterator<Item = &'a IncludeGraph>,
{
    graphs
        .into_iter()
        .filter(|graph| graph.affected_by(changed))
        .map(|graph| &graph.source)
        .collect()
}

#[cfg(test)]
mod tests;
