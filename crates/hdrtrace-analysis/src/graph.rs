//! Include graph construction
//!
//! Walks a translation unit's headers depth first, growing one macro registry
//! as it descends and resolving every include against it.

use hdrtrace_core::{HeaderId, Include, IncludeDirectives, Result};
use hdrtrace_parser::DirectiveProvider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::locator::FileLocator;
use crate::registry::MacroRegistry;
use crate::resolver::{IncludeResolver, Resolution, UnresolvedReason};
use crate::summary::SummaryCache;

/// A resolved `from` includes `to` edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IncludeEdge {
    pub from: HeaderId,
    pub to: HeaderId,
}

/// An include whose target could not be pinned to one header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeIssue {
    /// Header containing the include
    pub from: HeaderId,
    pub include: Include,
    pub problem: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// Several headers matched; all of them were followed
    Ambiguous { candidates: BTreeSet<HeaderId> },
    /// No header matched
    Unresolved { reason: UnresolvedReason },
}

impl std::fmt::Display for IncludeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            IssueKind::Ambiguous { candidates } => write!(
                f,
                "{}: {} is ambiguous ({} candidates)",
                self.from,
                self.include,
                candidates.len()
            ),
            IssueKind::Unresolved { reason } => write!(f, "{}: {}: {}", self.from, self.include, reason),
        }
    }
}

/// Headers, edges and issues collected by a traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reached {
    pub headers: BTreeSet<HeaderId>,
    pub edges: BTreeSet<IncludeEdge>,
    pub issues: Vec<IncludeIssue>,
}

impl Reached {
    /// Record the outcome of one include and return the headers to follow
    pub(crate) fn record(&mut self, from: &HeaderId, include: &Include, resolution: Resolution) -> Vec<HeaderId> {
        match resolution {
            Resolution::Resolved(target) => {
                self.edge(from, &target);
                vec![target]
            }
            Resolution::Ambiguous(candidates) => {
                debug!("{}: ambiguous {} ({} candidates)", from, include, candidates.len());
                for target in &candidates {
                    self.edge(from, target);
                }
                let targets = candidates.iter().cloned().collect();
                self.issue(IncludeIssue {
                    from: from.clone(),
                    include: include.clone(),
                    problem: IssueKind::Ambiguous { candidates },
                });
                targets
            }
            Resolution::Unresolved(reason) => {
                debug!("{}: unresolved {}: {}", from, include, reason);
                self.issue(IncludeIssue {
                    from: from.clone(),
                    include: include.clone(),
                    problem: IssueKind::Unresolved { reason },
                });
                Vec::new()
            }
        }
    }

    /// Merge everything another traversal reached
    pub(crate) fn absorb(&mut self, other: &Reached) {
        self.headers.extend(other.headers.iter().cloned());
        self.edges.extend(other.edges.iter().cloned());
        for issue in &other.issues {
            self.issue(issue.clone());
        }
    }

    fn edge(&mut self, from: &HeaderId, to: &HeaderId) {
        self.edges.insert(IncludeEdge {
            from: from.clone(),
            to: to.clone(),
        });
    }

    fn issue(&mut self, issue: IncludeIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }
}

/// Include graph of one translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeGraph {
    /// The translation unit
    pub source: HeaderId,
    /// Every file reached, the source included
    pub headers: BTreeSet<HeaderId>,
    pub edges: BTreeSet<IncludeEdge>,
    /// Includes that did not resolve to exactly one header
    pub issues: Vec<IncludeIssue>,
}

impl IncludeGraph {
    /// False when some include could not be pinned down, in which case the
    /// dependency set is only a lower bound
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Headers the source depends on
    pub fn dependencies(&self) -> impl Iterator<Item = &HeaderId> {
        self.headers.iter().filter(move |h| *h != &self.source)
    }

    /// Whether a change to `header` may require rebuilding the source.
    ///
    /// An incomplete graph answers yes for every header.
    pub fn affected_by(&self, header: &HeaderId) -> bool {
        !self.is_complete() || self.headers.contains(header)
    }

    /// Headers directly included by `header`
    pub fn includes_of<'a>(&'a self, header: &'a HeaderId) -> impl Iterator<Item = &'a HeaderId> + 'a {
        self.edges.iter().filter(move |e| &e.from == header).map(|e| &e.to)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fetch a directive set and check the provider contract
pub(crate) fn fetch_directives<P: DirectiveProvider>(
    provider: &P,
    header: &HeaderId,
) -> Result<Arc<IncludeDirectives>> {
    let directives = provider.directives(header)?;
    directives.validate(&header.to_string())?;
    Ok(directives)
}

/// Builds include graphs
pub struct GraphBuilder<'a, P, L> {
    provider: &'a P,
    resolver: &'a IncludeResolver<L>,
    summaries: Option<&'a SummaryCache>,
}

impl<'a, P: DirectiveProvider, L: FileLocator> GraphBuilder<'a, P, L> {
    pub fn new(provider: &'a P, resolver: &'a IncludeResolver<L>) -> Self {
        Self {
            provider,
            resolver,
            summaries: None,
        }
    }

    /// Reuse and publish header summaries through `cache`
    pub fn with_summaries(mut self, cache: &'a SummaryCache) -> Self {
        self.summaries = Some(cache);
        self
    }

    /// Build the include graph of one translation unit
    pub fn build(&self, source: &HeaderId) -> Result<IncludeGraph> {
        let mut traversal = Traversal {
            builder: self,
            registry: MacroRegistry::new(),
            descents: HashMap::new(),
            active: HashSet::new(),
            reached: Reached::default(),
        };

        traversal.reached.headers.insert(source.clone());
        traversal.descend(source)?;

        let Traversal { reached, registry, .. } = traversal;
        debug!(
            "{}: {} headers, {} edges, {} issues, {} macro sets visible",
            source,
            reached.headers.len(),
            reached.edges.len(),
            reached.issues.len(),
            registry.len()
        );

        Ok(IncludeGraph {
            source: source.clone(),
            headers: reached.headers,
            edges: reached.edges,
            issues: reached.issues,
        })
    }
}

/// Last descent into a header within one unit
#[derive(Debug, Clone, Copy)]
struct Descent {
    /// Registry size when the descent started
    registry_len: usize,
    /// Some include at or below the header is named through a macro
    dependent: bool,
}

/// Per-unit traversal state
struct Traversal<'b, 'a, P, L> {
    builder: &'b GraphBuilder<'a, P, L>,
    registry: MacroRegistry,
    descents: HashMap<HeaderId, Descent>,
    /// Headers on the current include chain
    active: HashSet<HeaderId>,
    reached: Reached,
}

impl<P: DirectiveProvider, L: FileLocator> Traversal<'_, '_, P, L> {
    /// Visit an included header and report whether its subtree depends on
    /// the macros visible at the point of inclusion.
    ///
    /// A dependent header is descended again whenever more macro sets have
    /// become visible since its last descent, so each inclusion resolves
    /// against the definitions in effect there.
    fn visit(&mut self, header: &HeaderId) -> Result<bool> {
        if self.active.contains(header) {
            return Ok(true);
        }
        match self.descents.get(header) {
            Some(last) if !last.dependent || last.registry_len == self.registry.len() => {
                return Ok(last.dependent);
            }
            Some(_) => {
                debug!("Revisiting {} with {} macro sets visible", header, self.registry.len());
                return self.descend(header);
            }
            None => {}
        }
        self.reached.headers.insert(header.clone());

        if let Some(cache) = self.builder.summaries {
            if let Some(summary) = cache.summarize(header, self.builder.provider, self.builder.resolver)? {
                self.registry.append_all(&summary.registry);
                let independent = Descent {
                    registry_len: self.registry.len(),
                    dependent: false,
                };
                for reached in &summary.reached.headers {
                    self.descents.entry(reached.clone()).or_insert(independent);
                }
                self.reached.absorb(&summary.reached);
                return Ok(false);
            }
        }

        self.descend(header)
    }

    fn descend(&mut self, header: &HeaderId) -> Result<bool> {
        let directives = fetch_directives(self.builder.provider, header)?;
        self.registry.append(header.clone(), directives.clone());
        let registry_len = self.registry.len();

        self.active.insert(header.clone());
        let mut dependent = directives.has_macro_includes();
        for include in directives.includes() {
            let resolution = self.builder.resolver.resolve(&self.registry, include, header);
            for target in self.reached.record(header, include, resolution) {
                dependent |= self.visit(&target)?;
            }
        }
        self.active.remove(header);

        self.descents.insert(
            header.clone(),
            Descent {
                registry_len,
                dependent,
            },
        );
        Ok(dependent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrtrace_core::IncludeKind;
    use hdrtrace_parser::MemoryProvider;
    use pretty_assertions::assert_eq;

    /// Locator where every file exists under its own name
    fn identity(target: &str, _kind: IncludeKind, _from: &HeaderId) -> Vec<HeaderId> {
        vec![HeaderId::new(target)]
    }

    fn ids(names: &[&str]) -> BTreeSet<HeaderId> {
        names.iter().map(|n| HeaderId::new(*n)).collect()
    }

    #[test]
    fn test_macro_include_sees_earlier_definition() {
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .include(Include::quoted("config.h"))
                    .include(Include::macro_ref("PLATFORM_H"))
                    .build(),
            )
            .with("config.h", IncludeDirectives::builder().define("PLATFORM_H", "\"linux.h\"").build())
            .with("linux.h", IncludeDirectives::default());
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        assert!(graph.is_complete());
        assert_eq!(graph.headers, ids(&["main.c", "config.h", "linux.h"]));
        assert_eq!(
            graph.includes_of(&HeaderId::new("main.c")).cloned().collect::<BTreeSet<_>>(),
            ids(&["config.h", "linux.h"])
        );
    }

    #[test]
    fn test_unresolved_include_does_not_stop_siblings() {
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .include(Include::macro_ref("UNKNOWN"))
                    .include(Include::quoted("a.h"))
                    .build(),
            )
            .with("a.h", IncludeDirectives::default());
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        assert!(!graph.is_complete());
        assert!(graph.headers.contains(&HeaderId::new("a.h")));
        assert_eq!(
            graph.issues[0].problem,
            IssueKind::Unresolved {
                reason: UnresolvedReason::UndefinedMacro("UNKNOWN".into())
            }
        );
        // conservative: any header may matter
        assert!(graph.affected_by(&HeaderId::new("unrelated.h")));
    }

    #[test]
    fn test_ambiguous_include_follows_all_candidates() {
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .define("IMPL", "\"a.h\"")
                    .define("IMPL", "\"b.h\"")
                    .include(Include::macro_ref("IMPL"))
                    .build(),
            )
            .with("a.h", IncludeDirectives::builder().include(Include::quoted("a_dep.h")).build())
            .with("a_dep.h", IncludeDirectives::default())
            .with("b.h", IncludeDirectives::default());
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        assert_eq!(graph.headers, ids(&["main.c", "a.h", "a_dep.h", "b.h"]));
        assert!(matches!(graph.issues[0].problem, IssueKind::Ambiguous { .. }));
    }

    #[test]
    fn test_include_cycle_terminates() {
        let provider = MemoryProvider::new()
            .with("a.h", IncludeDirectives::builder().include(Include::quoted("b.h")).build())
            .with("b.h", IncludeDirectives::builder().include(Include::quoted("a.h")).build());
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("a.h")).unwrap();
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.dependencies().count(), 1);
    }

    #[test]
    fn test_reinclusion_sees_new_definitions() {
        // X-macro style: gen.h expands X_FILE each time it is included
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .include(Include::quoted("cfg1.h"))
                    .include(Include::quoted("gen.h"))
                    .include(Include::quoted("cfg2.h"))
                    .include(Include::quoted("gen.h"))
                    .build(),
            )
            .with("cfg1.h", IncludeDirectives::builder().define("X_FILE", "\"a.def\"").build())
            .with("cfg2.h", IncludeDirectives::builder().define("X_FILE", "\"b.def\"").build())
            .with("gen.h", IncludeDirectives::builder().include(Include::macro_ref("X_FILE")).build())
            .with("a.def", IncludeDirectives::default())
            .with("b.def", IncludeDirectives::default());
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        assert!(graph.is_complete());
        assert_eq!(
            graph.headers,
            ids(&["main.c", "cfg1.h", "cfg2.h", "gen.h", "a.def", "b.def"])
        );
        assert_eq!(
            graph.includes_of(&HeaderId::new("gen.h")).cloned().collect::<BTreeSet<_>>(),
            ids(&["a.def", "b.def"])
        );
        assert!(graph.affected_by(&HeaderId::new("b.def")));
    }

    #[test]
    fn test_reinclusion_with_summaries() {
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .include(Include::quoted("cfg1.h"))
                    .include(Include::quoted("wrap.h"))
                    .include(Include::quoted("cfg2.h"))
                    .include(Include::quoted("wrap.h"))
                    .build(),
            )
            .with("cfg1.h", IncludeDirectives::builder().define("X_FILE", "\"a.def\"").build())
            .with("cfg2.h", IncludeDirectives::builder().define("X_FILE", "\"b.def\"").build())
            .with("wrap.h", IncludeDirectives::builder().include(Include::quoted("gen.h")).build())
            .with("gen.h", IncludeDirectives::builder().include(Include::macro_ref("X_FILE")).build())
            .with("a.def", IncludeDirectives::default())
            .with("b.def", IncludeDirectives::default());
        let resolver = IncludeResolver::new(identity);
        let cache = SummaryCache::new();
        let unit = HeaderId::new("main.c");

        let plain = GraphBuilder::new(&provider, &resolver).build(&unit).unwrap();
        let summarized = GraphBuilder::new(&provider, &resolver)
            .with_summaries(&cache)
            .build(&unit)
            .unwrap();

        assert!(plain.headers.contains(&HeaderId::new("b.def")));
        assert_eq!(plain, summarized);
    }

    #[test]
    fn test_unparsed_include_marks_graph_incomplete() {
        let provider = MemoryProvider::new()
            .with(
                "main.c",
                IncludeDirectives::builder()
                    .define("A", "\"x.h\"")
                    .include(Include::unparsed("A B"))
                    .build(),
            );
        let resolver = IncludeResolver::new(identity);

        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        assert!(!graph.is_complete());
        assert!(graph.affected_by(&HeaderId::new("x.h")));
    }

    #[test]
    fn test_provider_failure_aborts() {
        let provider = MemoryProvider::new()
            .with("main.c", IncludeDirectives::builder().include(Include::quoted("gone.h")).build());
        let resolver = IncludeResolver::new(identity);

        assert!(GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).is_err());
    }

    #[test]
    fn test_malformed_directives_abort() {
        let provider = MemoryProvider::new().with(
            "main.c",
            IncludeDirectives::builder().define_function("F", ["x", "x"], "x").build(),
        );
        let resolver = IncludeResolver::new(identity);

        let err = GraphBuilder::new(&provider, &resolver)
            .build(&HeaderId::new("main.c"))
            .unwrap_err();
        assert!(matches!(err, hdrtrace_core::Error::MalformedDirectives { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let provider = MemoryProvider::new()
            .with("main.c", IncludeDirectives::builder().include(Include::macro_ref("X")).build());
        let resolver = IncludeResolver::new(identity);
        let graph = GraphBuilder::new(&provider, &resolver).build(&HeaderId::new("main.c")).unwrap();

        let json = graph.to_json().unwrap();
        assert!(json.contains("undefined_macro"));
        assert_eq!(IncludeGraph::from_json(&json).unwrap(), graph);
    }
}
