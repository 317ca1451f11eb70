//! Directive scanner
//!
//! Line-oriented extraction of `#define` and `#include` directives. This is
//! not a preprocessor: conditionals are not evaluated, so every definition in
//! every branch is recorded, and `#undef` does not retract anything.

use hdrtrace_core::text::split_invocation;
use hdrtrace_core::{Include, IncludeDirectives, MacroDefinition};
use regex::Regex;
use tracing::debug;

/// Scanner for preprocessor directives
pub struct DirectiveScanner {
    directive: Regex,
    define: Regex,
}

impl DirectiveScanner {
    /// Create a new scanner
    pub fn new() -> Self {
        Self {
            directive: Regex::new(r"^\s*#\s*([A-Za-z_]\w*)(.*)$").expect("Invalid directive pattern"),
            define: Regex::new(r"^([A-Za-z_]\w*)(\([^)]*\))?(.*)$").expect("Invalid define pattern"),
        }
    }

    /// Extract the directive set of one source file
    pub fn scan(&self, source: &str) -> IncludeDirectives {
        let text = strip_comments(&join_continuations(source));
        let mut builder = IncludeDirectives::builder();

        for line in text.lines() {
            let Some(caps) = self.directive.captures(line) else {
                continue;
            };
            let rest = caps[2].trim();
            match &caps[1] {
                "define" => {
                    if let Some((name, def)) = self.parse_define(rest) {
                        builder = builder.definition(name, def);
                    }
                }
                "include" => builder = builder.include(parse_include_target(rest)),
                "include_next" => builder = builder.include(parse_include_target(rest).as_next()),
                "import" => builder = builder.include(parse_include_target(rest).as_import()),
                _ => {}
            }
        }

        builder.build()
    }

    fn parse_define(&self, rest: &str) -> Option<(String, MacroDefinition)> {
        let caps = self.define.captures(rest)?;
        let name = caps[1].to_string();
        let body = caps[3].trim().to_string();

        let def = match caps.get(2) {
            None => MacroDefinition::object(body),
            Some(params) => {
                let inner = params.as_str();
                let inner = &inner[1..inner.len() - 1];
                let params: Vec<String> = if inner.trim().is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(|p| p.trim().to_string()).collect()
                };
                let repeated = params.iter().enumerate().any(|(i, p)| params[..i].contains(p));
                if repeated || params.iter().any(String::is_empty) {
                    debug!("Skipping malformed definition of {}", name);
                    return None;
                }
                MacroDefinition::function(params, body)
            }
        };
        Some((name, def))
    }
}

impl Default for DirectiveScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse what follows `#include`. Text that names no target is kept as an
/// unparsed include so it is reported rather than lost.
fn parse_include_target(rest: &str) -> Include {
    if let Some(end) = rest.strip_prefix('"').and_then(|quoted| quoted.find('"')) {
        return Include::quoted(&rest[1..end + 1]);
    }
    if let Some(end) = rest.strip_prefix('<').and_then(|angled| angled.find('>')) {
        return Include::system(&rest[1..end + 1]);
    }
    match split_invocation(rest) {
        Some((name, None)) => Include::macro_ref(name),
        Some((name, Some(args))) => Include::macro_call(name, args),
        None => {
            debug!("Unsupported include target: {}", rest);
            Include::unparsed(rest)
        }
    }
}

/// Splice lines ending in a backslash
fn join_continuations(source: &str) -> String {
    source.replace("\\\r\n", "").replace("\\\n", "")
}

/// Replace comments with whitespace, keeping line breaks so every directive
/// stays on its own line
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut literal: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = literal {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == quote || c == '\n' {
                literal = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            ('"', _) | ('\'', _) => {
                literal = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
