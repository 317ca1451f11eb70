//! Macro expansion helpers for include targets
//!
//! Only what is needed to turn a macro-valued include into a path: parameter
//! substitution and classification of the resulting text. Token pasting and
//! stringification are not supported; bodies that rely on them classify as
//! [`IncludeExpr::Other`].

use hdrtrace_core::text::{is_ident_continue, is_ident_start, split_invocation};
use hdrtrace_core::{Include, IncludeKind};

pub use hdrtrace_core::text::split_arguments;

/// What a piece of include-target text denotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeExpr {
    /// `"path"`
    Quoted(String),
    /// `<path>`
    System(String),
    /// `NAME`
    Identifier(String),
    /// `NAME(args)`
    Invocation { name: String, args: Vec<String> },
    /// Anything else
    Other(String),
}

impl IncludeExpr {
    /// Classify the target of an include statement
    pub fn from_include(include: &Include) -> Self {
        match include.kind {
            IncludeKind::Quoted => IncludeExpr::Quoted(include.value.clone()),
            IncludeKind::System => IncludeExpr::System(include.value.clone()),
            IncludeKind::Unparsed => IncludeExpr::Other(include.value.clone()),
            IncludeKind::Macro => match &include.arguments {
                None => IncludeExpr::Identifier(include.value.clone()),
                Some(args) => IncludeExpr::Invocation {
                    name: include.value.clone(),
                    args: args.clone(),
                },
            },
        }
    }

    /// Classify expanded text
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            if !inner.is_empty() && !inner.contains('"') {
                return IncludeExpr::Quoted(inner.to_string());
            }
        }
        if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            let inner = collapse_spaces(inner);
            if !inner.is_empty() && !inner.contains('>') {
                return IncludeExpr::System(inner);
            }
        }

        match split_invocation(text) {
            Some((name, None)) => IncludeExpr::Identifier(name.to_string()),
            Some((name, Some(args))) => IncludeExpr::Invocation {
                name: name.to_string(),
                args,
            },
            None => IncludeExpr::Other(text.to_string()),
        }
    }
}

/// Replace each whole-identifier occurrence of a parameter in `body` with the
/// matching argument. String and character literals are copied unchanged.
///
/// `params` and `args` must have the same length.
pub fn substitute(params: &[String], args: &[String], body: &str) -> String {
    debug_assert_eq!(params.len(), args.len());

    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    let mut literal: Option<char> = None;
    let mut escaped = false;

    while let Some((start, c)) = chars.next() {
        if let Some(quote) = literal {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                literal = None;
            }
            continue;
        }

        if c == '"' || c == '\'' {
            literal = Some(c);
            out.push(c);
            continue;
        }

        if !is_ident_start(c) {
            out.push(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !is_ident_continue(next) {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }

        let ident = &body[start..end];
        match params.iter().position(|p| p == ident) {
            Some(index) => out.push_str(args[index].trim()),
            None => out.push_str(ident),
        }
    }

    out
}

/// System paths built by substitution may carry the whitespace that
/// separated tokens in the body, e.g. `< sys / name . h >`.
fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect()
}
