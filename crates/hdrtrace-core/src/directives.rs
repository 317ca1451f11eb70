//! Directive sets
//!
//! The macro definitions and include statements found in one header, as
//! handed out by a directive provider. A set is immutable once built.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How an include statement names its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    /// `#include "path"`
    Quoted,
    /// `#include <path>`
    System,
    /// `#include NAME` or `#include NAME(args)`
    Macro,
    /// A target that is none of the above, kept as written
    Unparsed,
}

/// A single `#include` or `#import` statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Include {
    /// Path for quoted and system includes, macro name for macro includes
    pub value: String,
    pub kind: IncludeKind,
    /// Written as `#import` rather than `#include`
    #[serde(default)]
    pub is_import: bool,
    /// Written as `#include_next`: lookup resumes after the search
    /// directory that holds the including file
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_next: bool,
    /// Argument list of a function-like invocation, `None` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
}

impl Include {
    pub fn quoted(path: impl Into<String>) -> Self {
        Self::new(path, IncludeKind::Quoted)
    }

    pub fn system(path: impl Into<String>) -> Self {
        Self::new(path, IncludeKind::System)
    }

    /// `#include NAME`
    pub fn macro_ref(name: impl Into<String>) -> Self {
        Self::new(name, IncludeKind::Macro)
    }

    /// `#include NAME(arg, ...)`
    pub fn macro_call<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: Some(arguments.into_iter().map(Into::into).collect()),
            ..Self::new(name, IncludeKind::Macro)
        }
    }

    /// Target text that could not be classified
    pub fn unparsed(text: impl Into<String>) -> Self {
        Self::new(text, IncludeKind::Unparsed)
    }

    pub fn as_import(mut self) -> Self {
        self.is_import = true;
        self
    }

    pub fn as_next(mut self) -> Self {
        self.is_next = true;
        self
    }

    fn new(value: impl Into<String>, kind: IncludeKind) -> Self {
        Self {
            value: value.into(),
            kind,
            is_import: false,
            is_next: false,
            arguments: None,
        }
    }
}

impl std::fmt::Display for Include {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keyword = match (self.is_import, self.is_next) {
            (true, _) => "#import",
            (false, true) => "#include_next",
            (false, false) => "#include",
        };
        match (&self.kind, &self.arguments) {
            (IncludeKind::Quoted, _) => write!(f, "{} \"{}\"", keyword, self.value),
            (IncludeKind::System, _) => write!(f, "{} <{}>", keyword, self.value),
            (IncludeKind::Macro, None) | (IncludeKind::Unparsed, _) => {
                write!(f, "{} {}", keyword, self.value)
            }
            (IncludeKind::Macro, Some(args)) => {
                write!(f, "{} {}({})", keyword, self.value, args.join(", "))
            }
        }
    }
}

/// One definition of a macro
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MacroDefinition {
    /// `#define NAME body`
    Object { body: String },
    /// `#define NAME(params) body`
    Function { params: Vec<String>, body: String },
}

impl MacroDefinition {
    pub fn object(body: impl Into<String>) -> Self {
        MacroDefinition::Object { body: body.into() }
    }

    pub fn function<I, S>(params: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MacroDefinition::Function {
            params: params.into_iter().map(Into::into).collect(),
            body: body.into(),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            MacroDefinition::Object { body } | MacroDefinition::Function { body, .. } => body,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, MacroDefinition::Function { .. })
    }
}

/// Directive set of one header.
///
/// Each macro name maps to the definitions written for it in this header.
/// Headers often define the same name in mutually exclusive `#if` branches;
/// since conditions are not evaluated, every distinct definition is kept, in
/// source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirectives {
    macros: IndexMap<String, Vec<MacroDefinition>>,
    includes: Vec<Include>,
}

impl IncludeDirectives {
    pub fn builder() -> IncludeDirectivesBuilder {
        IncludeDirectivesBuilder::default()
    }

    /// True when the header defines at least one macro of either form
    pub fn has_macros(&self) -> bool {
        !self.macros.is_empty()
    }

    /// Definitions of `name` in this header, empty when it is not defined here
    pub fn definitions(&self, name: &str) -> &[MacroDefinition] {
        self.macros.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Object-like definitions as `(name, body)` pairs
    pub fn object_macros(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().flat_map(|(name, defs)| {
            defs.iter().filter_map(move |def| match def {
                MacroDefinition::Object { body } => Some((name.as_str(), body.as_str())),
                MacroDefinition::Function { .. } => None,
            })
        })
    }

    /// Function-like definitions as `(name, params, body)` triples
    pub fn function_macros(&self) -> impl Iterator<Item = (&str, &[String], &str)> {
        self.macros.iter().flat_map(|(name, defs)| {
            defs.iter().filter_map(move |def| match def {
                MacroDefinition::Function { params, body } => {
                    Some((name.as_str(), params.as_slice(), body.as_str()))
                }
                MacroDefinition::Object { .. } => None,
            })
        })
    }

    /// Names of all macros defined here, in definition order
    pub fn macro_names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// Whether any include in this header names its target through a macro
    pub fn has_macro_includes(&self) -> bool {
        self.includes.iter().any(|i| i.kind == IncludeKind::Macro)
    }

    /// Check the provider contract.
    ///
    /// `header` is only used to label the error.
    pub fn validate(&self, header: &str) -> Result<()> {
        let malformed = |detail: String| Error::MalformedDirectives {
            header: header.to_string(),
            detail,
        };

        for (name, defs) in &self.macros {
            if name.trim().is_empty() {
                return Err(malformed("macro with an empty name".into()));
            }
            if defs.is_empty() {
                return Err(malformed(format!("macro {} has no definition", name)));
            }
            for def in defs {
                if let MacroDefinition::Function { params, .. } = def {
                    for (i, param) in params.iter().enumerate() {
                        if params[..i].contains(param) {
                            return Err(malformed(format!(
                                "macro {} repeats parameter {}",
                                name, param
                            )));
                        }
                    }
                }
            }
        }

        for include in &self.includes {
            match include.kind {
                IncludeKind::Macro if include.value.trim().is_empty() => {
                    return Err(malformed("macro include without a name".into()));
                }
                IncludeKind::Quoted | IncludeKind::System | IncludeKind::Unparsed
                    if include.arguments.is_some() =>
                {
                    return Err(malformed(format!("{} carries macro arguments", include)));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Builder for [`IncludeDirectives`]
#[derive(Debug, Default)]
pub struct IncludeDirectivesBuilder {
    directives: IncludeDirectives,
}

impl IncludeDirectivesBuilder {
    /// Add an object-like definition
    pub fn define(self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.definition(name, MacroDefinition::object(body))
    }

    /// Add a function-like definition
    pub fn define_function<I, S>(self, name: impl Into<String>, params: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition(name, MacroDefinition::function(params, body))
    }

    /// Add a definition; a repeated identical definition is dropped
    pub fn definition(mut self, name: impl Into<String>, def: MacroDefinition) -> Self {
        let defs = self.directives.macros.entry(name.into()).or_default();
        if !defs.contains(&def) {
            defs.push(def);
        }
        self
    }

    pub fn include(mut self, include: Include) -> Self {
        self.directives.includes.push(include);
        self
    }

    pub fn build(self) -> IncludeDirectives {
        self.directives
    }
}
