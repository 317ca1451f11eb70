//! Small text helpers shared by the scanner and the macro expander

/// Whether `c` can start a C identifier
pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Whether `c` can continue a C identifier
pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Whether the whole of `text` is one identifier
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Length in bytes of the identifier at the start of `text`, 0 if none
pub fn identifier_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !is_ident_continue(*c))
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Split `NAME` or `NAME(args)` into the name and its argument list.
///
/// Returns `None` when `text` is neither form, e.g. `NAME x` or `NAME(a`.
pub fn split_invocation(text: &str) -> Option<(&str, Option<Vec<String>>)> {
    let text = text.trim();
    let len = identifier_len(text);
    if len == 0 {
        return None;
    }
    let (name, rest) = text.split_at(len);
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Some((name, None));
    }
    if !rest.starts_with('(') {
        return None;
    }
    let close = matching_paren(rest)?;
    if close + 1 != rest.len() {
        return None;
    }
    let args = split_arguments(&rest[1..close])?;
    Some((name, Some(args)))
}

/// Split the text between an invocation's parentheses at top-level commas.
///
/// Commas nested in parentheses or inside string and character literals do
/// not split. Empty text is zero arguments. `None` on unbalanced input.
pub fn split_arguments(inner: &str) -> Option<Vec<String>> {
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut literal: Option<char> = None;
    let mut escaped = false;

    for c in inner.chars() {
        if let Some(quote) = literal {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                literal = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                literal = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if depth != 0 || literal.is_some() {
        return None;
    }
    args.push(current.trim().to_string());
    Some(args)
}

/// Byte index of the `)` closing the `(` that starts `text`
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut literal: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(quote) = literal {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                literal = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => literal = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
