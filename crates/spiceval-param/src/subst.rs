//! Recursive parameter and macro substitution.
//!
//! [`Substituter::line_subst`] walks a line of text, replacing every
//! parameter reference with its (recursively substituted) value and every
//! macro call `name(args)` with its body. Quoted `'...'` and `{...}` groups
//! are expanded, parsed and folded to a number where possible.
//!
//! Each top-level call tracks the definitions currently being expanded. A
//! definition that reaches itself again fails with [`Error::Cycle`]; the
//! tracking is undone by a drop guard, so an error leaves the table usable.

use std::cell::RefCell;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use spiceval_core::{UnitChars, format_number, scan_number_with};
use spiceval_expr::{
    EvalContext, Evaluate, Evaluation, Value, is_probe_function, parse_expression,
};

use crate::error::{Error, Result};
use crate::scan::{
    group_len, ident_len, is_atomic, is_ident_char, is_ident_start, is_identifier,
    is_operator_char, is_quoted_expr, split_args,
};
use crate::table::{ParamKey, ParamTable};

/// How `extract_params` reacts to a malformed definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Skip read-only names; keep what was read before a malformed pair.
    #[default]
    Lenient,
    /// Fail with the error.
    Strict,
}

/// Substitution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstOptions {
    pub mode: ExtractMode,
    /// Fold quoted expressions to numbers.
    pub eager: bool,
    /// Prefix for macro names generated by promotion.
    pub promote_prefix: String,
}

impl Default for SubstOptions {
    fn default() -> Self {
        Self {
            mode: ExtractMode::Lenient,
            eager: true,
            promote_prefix: "__macro".to_string(),
        }
    }
}

impl SubstOptions {
    pub fn with_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    pub fn with_promote_prefix(mut self, prefix: &str) -> Self {
        self.promote_prefix = prefix.to_string();
        self
    }
}

/// A macro emitted by promotion instead of being expanded inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    /// Generated unique name.
    pub name: String,
    pub arity: usize,
    /// Formal argument names.
    pub args: Vec<String>,
    /// Body with parameters substituted and formals left in place.
    pub body: String,
}

/// Receiver for promoted macros.
pub trait MacroSink {
    fn define(&mut self, definition: MacroDefinition);
}

impl MacroSink for Vec<MacroDefinition> {
    fn define(&mut self, definition: MacroDefinition) {
        self.push(definition);
    }
}

/// Definitions currently being expanded, by key.
type Active = RefCell<IndexSet<String>>;

/// Marks a definition as being expanded until dropped.
struct Guard<'a> {
    active: &'a Active,
    key: String,
}

impl<'a> Guard<'a> {
    fn enter(active: &'a Active, key: &ParamKey, name: &str, value: &str) -> Result<Self> {
        let key = key.to_string();
        if !active.borrow_mut().insert(key.clone()) {
            return Err(Error::Cycle {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        Ok(Self { active, key })
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().shift_remove(&self.key);
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope<'s> {
    /// Inside a `'...'` or `{...}` group: `%` is modulo, not concatenation.
    quoted: bool,
    /// Macro formals that must not be substituted.
    shadow: &'s [String],
}

const TOP: Scope<'static> = Scope {
    quoted: false,
    shadow: &[],
};

impl Scope<'_> {
    fn shadows(&self, word: &str) -> bool {
        self.shadow.iter().any(|s| s.eq_ignore_ascii_case(word))
    }
}

/// Line substitution over a [`ParamTable`].
pub struct Substituter<'a> {
    table: &'a mut ParamTable,
    options: SubstOptions,
    evaluator: Option<&'a dyn Evaluate>,
    sink: Option<&'a mut dyn MacroSink>,
}

impl<'a> Substituter<'a> {
    pub fn new(table: &'a mut ParamTable) -> Self {
        Self {
            table,
            options: SubstOptions::default(),
            evaluator: None,
            sink: None,
        }
    }

    pub fn with_options(mut self, options: SubstOptions) -> Self {
        self.options = options;
        self
    }

    /// Fold quoted expressions with `evaluator` instead of the built-in
    /// constants-only context.
    pub fn with_evaluator(mut self, evaluator: &'a dyn Evaluate) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Emit macro calls to `sink` rather than expanding them inline.
    pub fn with_sink(mut self, sink: &'a mut dyn MacroSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Substitute every parameter and macro reference in `text`.
    pub fn line_subst(&mut self, text: &str) -> Result<String> {
        let active = Active::default();
        let out = self.expand(text, &active, TOP)?;
        if out != text {
            log::debug!("line_subst {:?} -> {:?}", text, out);
        }
        Ok(out)
    }

    /// Substitute a single token: a parameter name or `def(name)`.
    ///
    /// Returns `None` when the token is not a defined parameter.
    pub fn subst(&mut self, token: &str) -> Result<Option<String>> {
        let token = token.trim();
        if let Some(name) = def_argument(token) {
            return Ok(Some(self.defined_flag(name).to_string()));
        }
        if !is_identifier(token) {
            return Ok(None);
        }
        let key = ParamKey::param(token);
        if self.table.get_key(&key).is_none() {
            return Ok(None);
        }
        let active = Active::default();
        self.param_value(&key, &active, TOP).map(Some)
    }

    fn is_macro(&self, name: &str) -> bool {
        self.table
            .iter()
            .any(|(key, _)| key.arity().is_some() && key.name().eq_ignore_ascii_case(name))
    }

    fn defined_flag(&self, name: &str) -> &'static str {
        if self.table.is_defined(name) { "1" } else { "0" }
    }

    fn expand(&mut self, text: &str, active: &Active, scope: Scope<'_>) -> Result<String> {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            if c == b'"' {
                // Double-quoted strings are copied verbatim.
                let len = group_len(&text[i..]).unwrap_or(text.len() - i);
                out.push_str(&text[i..i + len]);
                i += len;
            } else if c == b'\'' || c == b'{' {
                let len = group_len(&text[i..]).ok_or_else(|| {
                    if c == b'\'' {
                        Error::UnterminatedQuote(text.to_string())
                    } else {
                        Error::Unbalanced(text.to_string())
                    }
                })?;
                let folded = self.fold(&text[i + 1..i + len - 1], active, scope)?;
                out.push_str(&as_operand(folded, scope));
                i += len;
            } else if c.is_ascii_digit()
                || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
            {
                // Numbers are copied whole so suffixes like `meg` stay put.
                let len = scan_number_with(&text[i..], false, UnitChars::Word)
                    .map_or(1, |scan| scan.len);
                out.push_str(&text[i..i + len]);
                i += len;
            } else if is_ident_start(c) {
                i = self.identifier(text, i, &mut out, active, scope)?;
            } else {
                let ch = text[i..].chars().next().unwrap_or_default();
                out.push(ch);
                i += ch.len_utf8().max(1);
            }
        }
        Ok(out)
    }

    /// Handle the identifier starting at `start`; returns the position after
    /// everything consumed.
    fn identifier(
        &mut self,
        text: &str,
        start: usize,
        out: &mut String,
        active: &Active,
        scope: Scope<'_>,
    ) -> Result<usize> {
        let bytes = text.as_bytes();
        let end = start + ident_len(&text[start..]);
        let word = &text[start..end];
        let after = text[end..].trim_start();
        let open = text.len() - after.len();

        let dot_command = start > 0 && bytes[start - 1] == b'.';
        // Inside an expression `=` compares.
        let assignment = !scope.quoted && after.starts_with('=') && !after.starts_with("==");
        if dot_command || assignment || scope.shadows(word) {
            out.push_str(word);
            return Ok(end);
        }

        if text[end..].starts_with('(') && is_probe_function(word) {
            let len = group_len(&text[end..]).ok_or_else(|| Error::Unbalanced(text.to_string()))?;
            out.push_str(&text[start..end + len]);
            return Ok(end + len);
        }

        if after.starts_with('(') {
            let Some(len) = group_len(&text[open..]) else {
                if self.is_macro(word) {
                    return Err(Error::Unbalanced(text.to_string()));
                }
                // Not a call; the name stands alone.
                return self.plain(text, start, end, out, active, scope);
            };
            let args = split_args(&text[open + 1..open + len - 1])
                .ok_or_else(|| Error::Unbalanced(text.to_string()))?;
            let key = ParamKey::macro_key(word, args.len());
            if self.table.get_key(&key).is_some() {
                let replacement = self.call_macro(&key, &args, active, scope)?;
                return Ok(splice(out, &replacement, text, start, open + len, scope));
            }
            if word.eq_ignore_ascii_case("def") && args.len() == 1 {
                out.push_str(self.defined_flag(args[0]));
                return Ok(open + len);
            }
        }

        self.plain(text, start, end, out, active, scope)
    }

    /// Substitute the name at `start..end` as a plain parameter reference.
    fn plain(
        &mut self,
        text: &str,
        start: usize,
        end: usize,
        out: &mut String,
        active: &Active,
        scope: Scope<'_>,
    ) -> Result<usize> {
        let word = &text[start..end];
        let key = ParamKey::param(word);
        if self.table.get_key(&key).is_none() {
            out.push_str(word);
            return Ok(end);
        }
        let replacement = self.param_value(&key, active, scope)?;
        Ok(splice(out, &replacement, text, start, end, scope))
    }

    /// Fully substituted value of a plain parameter.
    fn param_value(&mut self, key: &ParamKey, active: &Active, scope: Scope<'_>) -> Result<String> {
        let Some(entry) = self.table.get_key(key) else {
            return Ok(key.name().to_string());
        };
        let name = entry.name.clone();
        let value = entry.value.clone();
        let collapsible = entry.is_quoted() && !entry.collapsed;

        let _guard = Guard::enter(active, key, &name, &value)?;
        let inner = Scope {
            quoted: scope.quoted,
            shadow: &[],
        };
        let result = self.expand(value.trim(), active, inner)?;

        if collapsible
            && self.options.eager
            && spiceval_core::parse_value(&result).is_some()
            && let Some(entry) = self.table.get_key_mut(key)
        {
            log::debug!("collapse {} = {} -> {}", key, entry.value, result);
            entry.value = result.clone();
            entry.collapsed = true;
        }
        log::debug!("substitute {} -> {}", key, result);
        Ok(result)
    }

    /// Expand a macro call, or promote it when a sink is attached.
    fn call_macro(
        &mut self,
        key: &ParamKey,
        args: &[&str],
        active: &Active,
        scope: Scope<'_>,
    ) -> Result<String> {
        let Some(entry) = self.table.get_key(key) else {
            return Ok(key.name().to_string());
        };
        let name = entry.name.clone();
        let body = entry.value.clone();
        let formals = entry.args.clone().unwrap_or_default();

        // Actuals belong to the caller, so a nested call to the same macro
        // is expanded before this one is marked active.
        let mut actuals = Vec::with_capacity(args.len());
        for arg in args {
            actuals.push(self.expand(arg.trim(), active, scope)?);
        }

        let _guard = Guard::enter(active, key, &name, &body)?;

        if self.sink.is_some() {
            let body = self.expand(
                body.trim(),
                active,
                Scope {
                    quoted: scope.quoted,
                    shadow: &formals,
                },
            )?;
            self.table.promoted += 1;
            let generated = format!("{}{}", self.options.promote_prefix, self.table.promoted);
            log::debug!("promote {} as {}", key, generated);
            if let Some(sink) = self.sink.as_mut() {
                sink.define(MacroDefinition {
                    name: generated.clone(),
                    arity: formals.len(),
                    args: formals,
                    body,
                });
            }
            return Ok(format!("{}({})", generated, actuals.join(", ")));
        }

        let actuals: Vec<String> = actuals
            .into_iter()
            .map(|a| if is_atomic(&a) { a } else { format!("({a})") })
            .collect();
        let text = replace_formals(body.trim(), &formals, &actuals);
        let result = self.expand(
            &text,
            active,
            Scope {
                quoted: scope.quoted,
                shadow: &[],
            },
        )?;
        log::debug!("expand {} -> {}", key, result);
        Ok(result)
    }

    /// Expand and, when possible, evaluate the body of a quoted group.
    fn fold(&mut self, inner: &str, active: &Active, scope: Scope<'_>) -> Result<String> {
        let expanded = self.expand(
            inner,
            active,
            Scope {
                quoted: true,
                shadow: scope.shadow,
            },
        )?;
        if !self.options.eager {
            return Ok(format!("'{expanded}'"));
        }

        let expr = parse_expression(&expanded)?;
        let evaluation = match self.evaluator {
            Some(evaluator) => evaluator.evaluate(&expr)?,
            None => EvalContext::new().evaluate(&expr)?,
        };
        Ok(match evaluation {
            Evaluation::Resolved(Value::Real(value)) => {
                let folded = format_number(value);
                log::debug!("fold '{}' -> {}", expanded, folded);
                folded
            }
            // A vector has no single-number spelling.
            _ => format!("'{expanded}'"),
        })
    }
}

/// Inside an expression, a still-quoted result becomes a parenthesized one.
fn as_operand(text: String, scope: Scope<'_>) -> String {
    if scope.quoted && text.starts_with('\'') && is_quoted_expr(&text) {
        format!("({})", &text[1..text.len() - 1])
    } else {
        text
    }
}

/// Write `replacement` for the site `start..end` of `text`; returns the
/// position to continue from.
fn splice(
    out: &mut String,
    replacement: &str,
    text: &str,
    start: usize,
    end: usize,
    scope: Scope<'_>,
) -> usize {
    let bytes = text.as_bytes();
    let mut end = end;
    if !scope.quoted {
        // `%` next to a substitution site glues the pieces together.
        if start > 0 && bytes[start - 1] == b'%' && out.ends_with('%') {
            out.pop();
        }
        if bytes.get(end) == Some(&b'%') {
            end += 1;
        }
    }

    let replacement = as_operand(replacement.to_string(), scope);
    let before = out.trim_end().bytes().last();
    let after = text[end..].trim_start().bytes().next();
    let next_to_operator =
        before.is_some_and(is_operator_char) || after.is_some_and(is_operator_char);
    if next_to_operator && !is_atomic(&replacement) {
        out.push('(');
        out.push_str(&replacement);
        out.push(')');
    } else {
        out.push_str(&replacement);
    }
    end
}

/// Replace formal argument names in a macro body with the actual text.
fn replace_formals(body: &str, formals: &[String], actuals: &[String]) -> String {
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'"' {
            let len = group_len(&body[i..]).unwrap_or(body.len() - i);
            out.push_str(&body[i..i + len]);
            i += len;
        } else if c.is_ascii_digit() {
            let len = scan_number_with(&body[i..], false, UnitChars::Word).map_or(1, |s| s.len);
            out.push_str(&body[i..i + len]);
            i += len;
        } else if is_ident_start(c) && (i == 0 || !is_ident_char(bytes[i - 1])) {
            let len = ident_len(&body[i..]);
            let word = &body[i..i + len];
            match formals.iter().position(|f| f.eq_ignore_ascii_case(word)) {
                Some(k) if i == 0 || bytes[i - 1] != b'.' => out.push_str(&actuals[k]),
                _ => out.push_str(word),
            }
            i += len;
        } else {
            let ch = body[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
        }
    }
    out
}

/// The argument of a `def(name)` token.
fn def_argument(token: &str) -> Option<&str> {
    let head = token.get(..4)?;
    if !head.eq_ignore_ascii_case("def(") || !token.ends_with(')') {
        return None;
    }
    let name = token[4..token.len() - 1].trim();
    is_identifier(name).then_some(name)
}

impl ParamTable {
    /// Substitute every parameter and macro reference in `text` with default
    /// options.
    pub fn line_subst(&mut self, text: &str) -> Result<String> {
        Substituter::new(self).line_subst(text)
    }

    /// Substitute a single token with default options.
    pub fn subst(&mut self, token: &str) -> Result<Option<String>> {
        Substituter::new(self).subst(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(defs: &[(&str, &str)]) -> ParamTable {
        let mut table = ParamTable::new();
        for (name, value) in defs {
            table.update(name, value).unwrap();
        }
        table
    }

    #[test]
    fn test_simple_substitution() {
        let mut t = table(&[("vdd", "1.8"), ("w", "2u")]);
        assert_eq!(t.line_subst("vdd*2 + w").unwrap(), "1.8*2 + 2u");
        assert_eq!(t.line_subst("VDD").unwrap(), "1.8");
        assert_eq!(t.line_subst("unknown+1").unwrap(), "unknown+1");
    }

    #[test]
    fn test_macro_scenario() {
        let mut t = table(&[("pi", "3.14159")]);
        t.define_macro("r", &["x"], "pi*x*x").unwrap();
        assert_eq!(t.line_subst("r(5)").unwrap(), "3.14159*5*5");
        assert_eq!(t.line_subst("'r(5)'").unwrap(), "78.53975");
    }

    #[test]
    fn test_nested_parameters() {
        let mut t = table(&[("a", "b*2"), ("b", "c+1"), ("c", "3")]);
        assert_eq!(t.line_subst("a").unwrap(), "(3+1)*2");
        assert_eq!(t.line_subst("{a}").unwrap(), "8");
    }

    #[test]
    fn test_parenthesize_next_to_operators() {
        let mut t = table(&[("x", "1+2"), ("y", "4")]);
        assert_eq!(t.line_subst("x*y").unwrap(), "(1+2)*4");
        assert_eq!(t.line_subst("x").unwrap(), "1+2");
        assert_eq!(t.line_subst("f(x)").unwrap(), "f(1+2)");
        assert_eq!(t.line_subst("'2*x'").unwrap(), "6");
    }

    #[test]
    fn test_macro_arguments_are_wrapped() {
        let mut t = ParamTable::new();
        t.define_macro("sq", &["x"], "x*x").unwrap();
        assert_eq!(t.line_subst("sq(a+1)").unwrap(), "(a+1)*(a+1)");
        assert_eq!(t.line_subst("'sq(1+2)'").unwrap(), "9");
        // Wrong arity is not a macro call.
        assert_eq!(t.line_subst("sq(1, 2)").unwrap(), "sq(1, 2)");
    }

    #[test]
    fn test_cycle_is_rejected_and_table_stays_usable() {
        let mut t = table(&[("a", "b+1"), ("b", "a*2"), ("c", "5")]);
        match t.line_subst("a") {
            Err(Error::Cycle { name, value }) => {
                assert_eq!(name, "a");
                assert_eq!(value, "b+1");
            }
            other => panic!("expected a cycle error, got {other:?}"),
        }
        assert_eq!(t.line_subst("c*2").unwrap(), "5*2");
        assert!(matches!(t.line_subst("b"), Err(Error::Cycle { .. })));
    }

    #[test]
    fn test_self_reference() {
        let mut t = table(&[("x", "x+1")]);
        assert!(matches!(t.line_subst("x"), Err(Error::Cycle { .. })));
        let mut t = ParamTable::new();
        t.define_macro("f", &["n"], "f(n-1)").unwrap();
        assert!(matches!(t.line_subst("f(3)"), Err(Error::Cycle { .. })));
    }

    #[test]
    fn test_nested_macro_calls() {
        let mut t = ParamTable::new();
        t.define_macro("f", &["x"], "x*2").unwrap();
        t.define_macro("sq", &["x"], "x*x").unwrap();
        t.define_macro("add", &["x", "y"], "x+y").unwrap();
        t.update("p", "sq(2)").unwrap();
        assert_eq!(t.line_subst("f(f(1))").unwrap(), "(1*2)*2");
        assert_eq!(t.line_subst("'f(f(1))'").unwrap(), "4");
        assert_eq!(t.line_subst("sq(p)").unwrap(), "(2*2)*(2*2)");
        assert_eq!(t.line_subst("add(add(1, 2), 3)").unwrap(), "(1+2)+3");
        assert_eq!(t.line_subst("'add(add(1, 2), sq(p))'").unwrap(), "19");
    }

    #[test]
    fn test_equals_inside_quotes_compares() {
        let mut t = table(&[("a", "2")]);
        assert_eq!(t.line_subst("'a=2'").unwrap(), "1");
        assert_eq!(t.line_subst("{a = 3}").unwrap(), "0");
        assert_eq!(t.line_subst("x a=a").unwrap(), "x a=2");
    }

    #[test]
    fn test_unbalanced_call_is_copied() {
        let mut t = table(&[("a", "1")]);
        assert_eq!(t.line_subst("foo(").unwrap(), "foo(");
        assert_eq!(t.line_subst("foo(a").unwrap(), "foo(1");
        assert_eq!(t.line_subst("a(a").unwrap(), "1(1");
        t.define_macro("sq", &["x"], "x*x").unwrap();
        assert!(matches!(t.line_subst("sq(a"), Err(Error::Unbalanced(_))));
    }

    #[test]
    fn test_vector_results_stay_quoted() {
        let mut t = table(&[("n", "3")]);
        assert_eq!(t.line_subst("'vector(3)'").unwrap(), "'vector(3)'");
        assert_eq!(t.line_subst("'vector(n)'").unwrap(), "'vector(3)'");
        assert_eq!(t.line_subst("'sum(vector(n))'").unwrap(), "3");
    }

    #[test]
    fn test_same_parameter_twice_is_not_a_cycle() {
        let mut t = table(&[("a", "2"), ("b", "a*a")]);
        assert_eq!(t.line_subst("b+a").unwrap(), "(2*2)+2");
    }

    #[test]
    fn test_idempotent() {
        let mut t = table(&[("pi", "3.14159"), ("w", "'2*5'")]);
        t.define_macro("r", &["x"], "pi*x*x").unwrap();
        for line in ["r(5) + w", "'r(w)'", ".param z=r(2)", "v(out)*pi"] {
            let once = t.line_subst(line).unwrap();
            let twice = t.line_subst(&once).unwrap();
            assert_eq!(once, twice, "{line:?}");
        }
    }

    #[test]
    fn test_protected_positions() {
        let mut t = table(&[("param", "X"), ("a", "1"), ("out", "9"), ("v", "2")]);
        assert_eq!(t.line_subst(".param a=out").unwrap(), ".param a=9");
        assert_eq!(t.line_subst("v(out) + v").unwrap(), "v(out) + 2");
        assert_eq!(t.line_subst("\"a out\" a").unwrap(), "\"a out\" 1");
        assert_eq!(t.line_subst("a == 1").unwrap(), "1 == 1");
    }

    #[test]
    fn test_numbers_are_not_split() {
        let mut t = table(&[("meg", "7"), ("k", "3"), ("e", "5")]);
        assert_eq!(t.line_subst("1meg + 2k + 1e3 + k").unwrap(), "1meg + 2k + 1e3 + 3");
    }

    #[test]
    fn test_percent_concatenation() {
        let mut t = table(&[("n", "3"), ("pre", "net")]);
        assert_eq!(t.line_subst("pre%n").unwrap(), "net3");
        assert_eq!(t.line_subst("node%n").unwrap(), "node3");
        assert_eq!(t.line_subst("7 % 2").unwrap(), "7 % 2");
        // Inside quotes `%` is modulo.
        assert_eq!(t.line_subst("'7%n'").unwrap(), "1");
    }

    #[test]
    fn test_def() {
        let mut t = table(&[("a", "1")]);
        t.define_macro("m", &["x"], "x").unwrap();
        assert_eq!(t.line_subst("def(a) + def(b)").unwrap(), "1 + 0");
        assert_eq!(t.line_subst("def(m)").unwrap(), "1");
        assert_eq!(t.subst("def(a)").unwrap().as_deref(), Some("1"));
        assert_eq!(t.subst("DEF(zz)").unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_subst_single_token() {
        let mut t = table(&[("a", "b+1"), ("b", "2")]);
        assert_eq!(t.subst("a").unwrap().as_deref(), Some("2+1"));
        assert_eq!(t.subst("nope").unwrap(), None);
        assert_eq!(t.subst("a+b").unwrap(), None);
    }

    #[test]
    fn test_quoted_values_collapse() {
        let mut t = table(&[("w", "'2*3'"), ("l", "{w+1}")]);
        assert_eq!(t.line_subst("l").unwrap(), "7");
        let w = t.get("w").unwrap();
        assert_eq!(w.value, "6");
        assert!(w.collapsed);
        assert!(t.get("l").unwrap().collapsed);
    }

    #[test]
    fn test_unresolved_quotes_are_kept() {
        let mut t = table(&[("g", "2")]);
        assert_eq!(t.line_subst("'x*g'").unwrap(), "'x*2'");
        assert_eq!(t.line_subst("{v(out)/g}").unwrap(), "'v(out)/2'");
        let mut t = table(&[("h", "'x+1'")]);
        assert_eq!(t.line_subst("'h*2'").unwrap(), "'(x+1)*2'");
        assert!(!t.get("h").unwrap().collapsed);
    }

    #[test]
    fn test_lazy_mode_keeps_quotes() {
        let mut t = table(&[("a", "2")]);
        let out = Substituter::new(&mut t)
            .with_options(SubstOptions::default().with_eager(false))
            .line_subst("'a+1'")
            .unwrap();
        assert_eq!(out, "'2+1'");
    }

    #[test]
    fn test_custom_evaluator() {
        let mut ctx = EvalContext::new();
        ctx.set_real("temp", 27.0);
        let mut t = table(&[("k", "2")]);
        let out = Substituter::new(&mut t)
            .with_evaluator(&ctx)
            .line_subst("'temp*k'")
            .unwrap();
        assert_eq!(out, "54");
    }

    #[test]
    fn test_quote_errors() {
        let mut t = ParamTable::new();
        assert!(matches!(t.line_subst("'1+2"), Err(Error::UnterminatedQuote(_))));
        assert!(matches!(t.line_subst("{1+2"), Err(Error::Unbalanced(_))));
        assert!(matches!(t.line_subst("'1/0'"), Err(Error::Eval(_))));
        assert!(matches!(t.line_subst("'1+'"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_promotion() {
        let mut t = table(&[("pi", "3.14159")]);
        t.define_macro("r", &["x"], "pi*x*x").unwrap();
        let mut sink: Vec<MacroDefinition> = Vec::new();
        let out = Substituter::new(&mut t)
            .with_sink(&mut sink)
            .line_subst("r(5) + r(2)")
            .unwrap();
        assert_eq!(out, "__macro1(5) + __macro2(2)");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].name, "__macro1");
        assert_eq!(sink[0].arity, 1);
        assert_eq!(sink[0].args, vec!["x".to_string()]);
        assert_eq!(sink[0].body, "3.14159*x*x");
    }

    #[test]
    fn test_promotion_shadows_formals() {
        let mut t = table(&[("x", "100")]);
        t.define_macro("dbl", &["x"], "2*x").unwrap();
        let mut sink: Vec<MacroDefinition> = Vec::new();
        let out = Substituter::new(&mut t)
            .with_options(SubstOptions::default().with_promote_prefix("m_"))
            .with_sink(&mut sink)
            .line_subst("dbl(x)")
            .unwrap();
        assert_eq!(out, "m_1(100)");
        assert_eq!(sink[0].body, "2*x");
    }

    #[test]
    fn test_options_round_trip_through_json() {
        let options = SubstOptions::default().with_mode(ExtractMode::Strict);
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"strict\""));
        let back: SubstOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
