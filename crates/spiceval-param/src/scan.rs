//! Small text scanners shared by extraction and substitution.

use spiceval_core::{UnitChars, scan_number_with};

/// True for characters that may start an identifier.
pub(crate) fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// True for characters that may continue an identifier.
pub(crate) fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$' | b'#')
}

/// Length of the identifier at the start of `text`, 0 if none.
pub(crate) fn ident_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(&c) if is_ident_start(c) => {
            1 + bytes[1..].iter().take_while(|&&c| is_ident_char(c)).count()
        }
        _ => 0,
    }
}

/// True if `text` is exactly one identifier.
pub(crate) fn is_identifier(text: &str) -> bool {
    !text.is_empty() && ident_len(text) == text.len()
}

/// Length of the `'...'`, `{...}`, `"..."` or `(...)` group opening at the
/// start of `text`, including both delimiters. `None` if it is not closed.
pub(crate) fn group_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes.first()? {
        b'\'' => (b'\'', b'\''),
        b'"' => (b'"', b'"'),
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        _ => return None,
    };
    if open == close {
        return bytes[1..].iter().position(|&c| c == close).map(|p| p + 2);
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' if open == b'(' => {
                // Quoted text inside parentheses is opaque.
                i += group_len(&text[i..])?;
                continue;
            }
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// True if `text` is a single quoted `'...'` or `{...}` expression.
pub(crate) fn is_quoted_expr(text: &str) -> bool {
    let text = text.trim();
    matches!(text.as_bytes().first(), Some(b'\'' | b'{')) && group_len(text) == Some(text.len())
}

/// Split a parenthesized argument list body on top-level commas.
pub(crate) fn split_args(body: &str) -> Option<Vec<&str>> {
    if body.trim().is_empty() {
        return Some(Vec::new());
    }
    let bytes = body.as_bytes();
    let mut args = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'{' | b'\'' | b'"' => {
                i += group_len(&body[i..])?;
                continue;
            }
            b',' => {
                args.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    args.push(body[start..].trim());
    Some(args)
}

/// True if `text` needs no parentheses when spliced next to an operator:
/// a single number, name, call, quoted group or parenthesized group.
pub(crate) fn is_atomic(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || is_identifier(text) {
        return true;
    }
    if !text.starts_with(['-', '+']) && scan_number_with(text, true, UnitChars::Word).is_some() {
        return true;
    }
    let name = ident_len(text);
    let rest = &text[name..];
    matches!(rest.as_bytes().first(), Some(b'(' | b'\'' | b'{' | b'"'))
        && (name == 0 || rest.starts_with('('))
        && group_len(rest) == Some(rest.len())
}

/// Characters that bind to a neighboring operand.
pub(crate) fn is_operator_char(c: u8) -> bool {
    matches!(
        c,
        b'+' | b'-' | b'*' | b'/' | b'^' | b'<' | b'>' | b'!' | b'&' | b'|' | b'?' | b':' | b'%' | b'~'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert_eq!(ident_len("abc+1"), 3);
        assert_eq!(ident_len("x.y_2 z"), 5);
        assert_eq!(ident_len("1abc"), 0);
        assert!(is_identifier("vdd"));
        assert!(!is_identifier("a b"));
    }

    #[test]
    fn test_groups() {
        assert_eq!(group_len("'a+b' rest"), Some(5));
        assert_eq!(group_len("{a*{b}} rest"), Some(7));
        assert_eq!(group_len("(f(a), ')') x"), Some(11));
        assert_eq!(group_len("(a"), None);
        assert_eq!(group_len("'open"), None);
        assert!(is_quoted_expr(" '1+2' "));
        assert!(is_quoted_expr("{1+2}"));
        assert!(!is_quoted_expr("{a}+{b}"));
        assert!(!is_quoted_expr("1+2"));
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("a, b+1 ,f(c, d)").unwrap(), vec!["a", "b+1", "f(c, d)"]);
        assert_eq!(split_args("  ").unwrap(), Vec::<&str>::new());
        assert_eq!(split_args("'x,y', z").unwrap(), vec!["'x,y'", "z"]);
        assert!(split_args("(a, b").is_none());
    }

    #[test]
    fn test_atomic() {
        for text in ["5", "1.5k", "pi", "(a+b)", "'a+b'", "{x}", "", "f(x)", "max(a, b)"] {
            assert!(is_atomic(text), "{text:?}");
        }
        for text in ["a+b", "-5", "f(x)+1", "(a)+(b)", "2*x", "f'x'"] {
            assert!(!is_atomic(text), "{text:?}");
        }
    }
}
