//! Reading `name=value` definitions into a [`ParamTable`].

use crate::error::{Error, Result};
use crate::scan::{group_len, ident_len, is_identifier, split_args};
use crate::subst::{ExtractMode, SubstOptions};
use crate::table::{ParamEntry, ParamTable};

/// Read every `name=value` or `name(args)=body` pair in `text` into `table`.
///
/// A leading `.param`, `.params` or `params:` keyword is skipped. Pairs are
/// separated by whitespace or commas; values are either a quoted group or a
/// run of non-blank text with balanced parentheses.
///
/// In [`ExtractMode::Lenient`] a read-only name is logged and skipped, and a
/// malformed pair is logged and ends the scan. In [`ExtractMode::Strict`] the
/// first error is returned; pairs read before it stay in `table`.
pub fn extract_params(table: &mut ParamTable, text: &str, options: &SubstOptions) -> Result<()> {
    let mut rest = strip_keyword(text.trim());

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let (entry, len) = match read_pair(rest) {
            Ok(pair) => pair,
            Err(err) => match options.mode {
                ExtractMode::Strict => return Err(err),
                ExtractMode::Lenient => {
                    log::warn!("ignoring parameters from {:?}: {}", rest, err);
                    break;
                }
            },
        };
        match table.insert(entry) {
            Ok(()) => {}
            Err(err @ Error::ReadOnly(_)) if options.mode == ExtractMode::Lenient => {
                log::warn!("skipping {:?}: {}", &rest[..len], err);
            }
            Err(err) => return Err(err),
        }
        rest = &rest[len..];
    }
    Ok(())
}

fn strip_keyword(text: &str) -> &str {
    let lower = text.to_ascii_lowercase();
    for keyword in [".params", ".param"] {
        if lower.starts_with(keyword)
            && lower[keyword.len()..].chars().next().is_none_or(char::is_whitespace)
        {
            return &text[keyword.len()..];
        }
    }
    if lower.starts_with("params:") {
        return &text["params:".len()..];
    }
    text
}

/// Parse one definition; returns it and the number of bytes consumed.
fn read_pair(text: &str) -> Result<(ParamEntry, usize)> {
    let name_len = ident_len(text);
    if name_len == 0 {
        let word = text
            .split(|c: char| c.is_whitespace() || c == '=')
            .next()
            .unwrap_or(text);
        return Err(Error::BadName(word.to_string()));
    }
    let name = &text[..name_len];
    let mut pos = name_len;

    let mut formals = None;
    if text[pos..].starts_with('(') {
        let len = group_len(&text[pos..]).ok_or_else(|| Error::Unbalanced(text.to_string()))?;
        let list = split_args(&text[pos + 1..pos + len - 1])
            .ok_or_else(|| Error::Unbalanced(text.to_string()))?;
        if let Some(bad) = list.iter().find(|a| !is_identifier(a)) {
            return Err(Error::BadName(format!("{name}: {bad:?}")));
        }
        formals = Some(list.into_iter().map(String::from).collect::<Vec<_>>());
        pos += len;
    }

    pos += blank_len(&text[pos..]);
    if !text[pos..].starts_with('=') {
        return Err(Error::MissingValue(name.to_string()));
    }
    pos += 1;
    pos += blank_len(&text[pos..]);

    let len = value_len(&text[pos..])?;
    if len == 0 {
        return Err(Error::MissingValue(name.to_string()));
    }
    let value = &text[pos..pos + len];

    let mut entry = ParamEntry::new(name, value);
    entry.args = formals;
    Ok((entry, pos + len))
}

fn blank_len(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Length of the value at the start of `text`.
fn value_len(text: &str) -> Result<usize> {
    match text.as_bytes().first() {
        Some(b'\'') => {
            return group_len(text).ok_or_else(|| Error::UnterminatedQuote(text.to_string()));
        }
        Some(b'{') => return group_len(text).ok_or_else(|| Error::Unbalanced(text.to_string())),
        _ => {}
    }

    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'{' => {
                i += group_len(&text[i..]).ok_or_else(|| Error::Unbalanced(text.to_string()))?;
                continue;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => return Err(Error::Unbalanced(text.to_string())),
            b')' => depth -= 1,
            c if depth == 0 && (c.is_ascii_whitespace() || c == b',') => break,
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(Error::Unbalanced(text.to_string()));
    }
    Ok(i)
}
