//! Include resolution
//!
//! Turns one include statement into the header(s) it refers to. Literal
//! targets go straight to the file locator. Macro targets are expanded
//! against the definitions visible in the registry, most recent first.
//!
//! Failures are not errors: callers receive them as [`Resolution::Unresolved`]
//! or [`Resolution::Ambiguous`] and must assume the worst.

use hdrtrace_core::config::{DEFAULT_MAX_EXPANSION_DEPTH, DEFAULT_MAX_EXPANSION_STEPS};
use hdrtrace_core::{HeaderId, Include, IncludeKind, MacroDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::expand::{substitute, IncludeExpr};
use crate::locator::FileLocator;
use crate::registry::MacroRegistry;

/// Outcome of resolving one include statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one header
    Resolved(HeaderId),
    /// Two or more distinct headers
    Ambiguous(BTreeSet<HeaderId>),
    /// No header could be determined
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Every header this outcome names, empty when unresolved
    pub fn candidates(&self) -> Vec<&HeaderId> {
        match self {
            Resolution::Resolved(header) => vec![header],
            Resolution::Ambiguous(headers) => headers.iter().collect(),
            Resolution::Unresolved(_) => Vec::new(),
        }
    }
}

/// Why an include could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnresolvedReason {
    #[error("undefined macro {0}")]
    UndefinedMacro(String),

    #[error("malformed macro invocation {0}")]
    MalformedInvocation(String),

    #[error("macro expansion cycle at {0}")]
    ExpansionCycle(String),

    #[error("macro expands to `{0}` which is not an include target")]
    NotAnIncludeTarget(String),

    #[error("include target {0} not found")]
    NotFound(String),
}

/// Resolver for include statements
pub struct IncludeResolver<L> {
    locator: L,
    max_depth: usize,
    max_steps: usize,
}

impl<L: FileLocator> IncludeResolver<L> {
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            max_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            max_steps: DEFAULT_MAX_EXPANSION_STEPS,
        }
    }

    /// Set the bound on nested macro expansion
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Set the bound on the number of macro expansions for one include
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Resolve `include`, written in `from`, against the macros in `registry`
    pub fn resolve(&self, registry: &MacroRegistry, include: &Include, from: &HeaderId) -> Resolution {
        let mut expansion = Expansion {
            resolver: self,
            registry,
            from,
            next: include.is_next,
            active: Vec::new(),
            expanded: HashSet::new(),
            steps: 0,
            found: BTreeSet::new(),
        };

        let outcome = match expansion.expand(IncludeExpr::from_include(include)) {
            Err(reason) => Resolution::Unresolved(reason),
            Ok(()) => {
                let mut found = expansion.found;
                match found.pop_first() {
                    Some(header) if found.is_empty() => Resolution::Resolved(header),
                    Some(header) => {
                        found.insert(header);
                        Resolution::Ambiguous(found)
                    }
                    // expand() succeeds only after locating at least one file
                    None => Resolution::Unresolved(UnresolvedReason::NotFound(include.to_string())),
                }
            }
        };

        debug!("{} in {} -> {:?}", include, from, outcome);
        outcome
    }
}

/// State of one resolution
struct Expansion<'a, L> {
    resolver: &'a IncludeResolver<L>,
    registry: &'a MacroRegistry,
    from: &'a HeaderId,
    /// `#include_next` lookup
    next: bool,
    /// Macros being expanded, outermost first
    active: Vec<String>,
    /// Invocations already expanded successfully; their candidates are in
    /// `found`
    expanded: HashSet<(String, Option<Vec<String>>)>,
    steps: usize,
    found: BTreeSet<HeaderId>,
}

impl<L: FileLocator> Expansion<'_, L> {
    fn expand(&mut self, expr: IncludeExpr) -> Result<(), UnresolvedReason> {
        match expr {
            IncludeExpr::Quoted(path) => self.locate(&path, IncludeKind::Quoted),
            IncludeExpr::System(path) => self.locate(&path, IncludeKind::System),
            IncludeExpr::Identifier(name) => self.expand_macro(name, None),
            IncludeExpr::Invocation { name, args } => self.expand_macro(name, Some(args)),
            IncludeExpr::Other(text) => Err(UnresolvedReason::NotAnIncludeTarget(text)),
        }
    }

    fn locate(&mut self, path: &str, kind: IncludeKind) -> Result<(), UnresolvedReason> {
        let locator = &self.resolver.locator;
        let candidates = if self.next {
            locator.locate_next(path, kind, self.from)
        } else {
            locator.locate(path, kind, self.from)
        };
        if candidates.is_empty() {
            return Err(UnresolvedReason::NotFound(path.to_string()));
        }
        self.found.extend(candidates);
        Ok(())
    }

    fn expand_macro(&mut self, name: String, args: Option<Vec<String>>) -> Result<(), UnresolvedReason> {
        if self.active.len() >= self.resolver.max_depth || self.active.contains(&name) {
            return Err(UnresolvedReason::ExpansionCycle(name));
        }

        let key = (name, args);
        if self.expanded.contains(&key) {
            return Ok(());
        }
        let (name, args) = key;

        self.steps += 1;
        if self.steps > self.resolver.max_steps {
            return Err(UnresolvedReason::ExpansionCycle(name));
        }

        let registry = self.registry;
        let definitions = match registry.lookup(&name) {
            Some((_, definitions)) if !definitions.is_empty() => definitions,
            _ => return Err(UnresolvedReason::UndefinedMacro(name)),
        };

        self.active.push(name.clone());
        let result = definitions
            .iter()
            .try_for_each(|definition| self.expand_definition(&name, definition, args.as_deref()));
        self.active.pop();

        result?;
        self.expanded.insert((name, args));
        Ok(())
    }

    fn expand_definition(
        &mut self,
        name: &str,
        definition: &MacroDefinition,
        args: Option<&[String]>,
    ) -> Result<(), UnresolvedReason> {
        let malformed = || UnresolvedReason::MalformedInvocation(name.to_string());

        match (definition, args) {
            (MacroDefinition::Object { body }, None) => self.expand(IncludeExpr::parse(body)),
            // The object-like body names a function-like macro that takes the
            // arguments written after the original name
            (MacroDefinition::Object { body }, Some(args)) => match IncludeExpr::parse(body) {
                IncludeExpr::Identifier(next) => self.expand_macro(next, Some(args.to_vec())),
                _ => Err(malformed()),
            },
            (MacroDefinition::Function { .. }, None) => Err(malformed()),
            (MacroDefinition::Function { params, body }, Some(args)) => {
                if params.len() != args.len() {
                    return Err(malformed());
                }
                self.expand(IncludeExpr::parse(&substitute(params, args, body)))
            }
        }
    }
}
