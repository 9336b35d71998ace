//! Operator-precedence (shift/reduce) expression parser.
//!
//! The parser keeps a stack of operators and operand values with an `End`
//! sentinel at the bottom. Each incoming token is compared with the topmost
//! operator through [`relation`]: lower precedence shifts, higher reduces.
//! A reduction collapses the span above the nearest `Less` boundary into a
//! single tree node.

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ParseError, Result};
use crate::lexer::Lexer;
use crate::ptable::{Relation, relation};
use crate::token::{Datum, Token, TokenKind};

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum number of stack elements before the parse fails with
    /// [`ParseError::Overflow`].
    pub stack_capacity: usize,
    /// Maximum depth of the built tree. Left-associative chains reduce as
    /// they go and never fill the stack, so their depth is bounded here.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            stack_capacity: 200,
            max_depth: 500,
        }
    }
}

impl ParseOptions {
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// A parser stack element.
#[derive(Debug, Clone, PartialEq)]
enum Element {
    Op(TokenKind),
    /// Operand and the depth of its tree.
    Value(Datum, usize),
}

/// Shift/reduce parser over one source string.
///
/// [`Parser::parse`] reads one expression; [`Parser::residue`] then returns
/// whatever input follows it, so `;`-separated lists can be read by calling
/// `parse` repeatedly.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    stack: Vec<Element>,
    options: ParseOptions,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_options(input, ParseOptions::default())
    }

    pub fn with_options(input: &'a str, options: ParseOptions) -> Self {
        Self {
            lexer: Lexer::new(input),
            stack: Vec::new(),
            options,
        }
    }

    /// Input not consumed by the last parse.
    pub fn residue(&self) -> &'a str {
        self.lexer.residue()
    }

    /// Parse the next expression.
    pub fn parse(&mut self) -> Result<Expr> {
        self.lexer.reset();
        self.stack.clear();
        self.stack.push(Element::Op(TokenKind::End));

        let result = self.run();
        // Partially built nodes are dropped with the stack.
        self.stack.clear();
        result
    }

    fn run(&mut self) -> Result<Expr> {
        let mut next = self.lexer.next_token();
        loop {
            let top = self.top_op();
            match relation(top, next.kind) {
                Relation::Equal if next.kind == TokenKind::End => return self.accept(),
                Relation::Less | Relation::Equal => {
                    self.shift(next)?;
                    next = self.lexer.next_token();
                }
                Relation::Greater => self.reduce()?,
                Relation::Error => {
                    // `expr )` at the outermost level ends the expression and
                    // leaves the `)` for the caller.
                    if top == TokenKind::End
                        && next.kind == TokenKind::RParen
                        && self.stack.len() == 2
                    {
                        self.lexer.unread();
                        return self.accept();
                    }
                    return Err(ParseError::Syntax(format!(
                        "unexpected '{}' after '{}'",
                        next.kind.symbol(),
                        top.symbol()
                    )));
                }
            }
        }
    }

    fn accept(&mut self) -> Result<Expr> {
        if self.stack.len() != 2 {
            return Err(ParseError::Syntax(if self.stack.len() < 2 {
                "empty expression".to_string()
            } else {
                "incomplete expression".to_string()
            }));
        }
        match self.stack.pop() {
            Some(Element::Value(datum, _)) => datum
                .into_expr()
                .ok_or_else(|| ParseError::BadNode("empty operand".to_string())),
            _ => Err(ParseError::Syntax("incomplete expression".to_string())),
        }
    }

    fn top_op(&self) -> TokenKind {
        self.op_below(self.stack.len())
            .map(|i| self.op_at(i))
            .unwrap_or(TokenKind::End)
    }

    /// Index of the nearest operator strictly below `index`.
    fn op_below(&self, index: usize) -> Option<usize> {
        self.stack[..index]
            .iter()
            .rposition(|e| matches!(e, Element::Op(_)))
    }

    fn op_at(&self, index: usize) -> TokenKind {
        match self.stack[index] {
            Element::Op(kind) => kind,
            Element::Value(..) => TokenKind::Value,
        }
    }

    fn shift(&mut self, token: Token) -> Result<()> {
        let element = if token.kind == TokenKind::Value {
            if matches!(self.stack.last(), Some(Element::Value(..))) {
                return Err(ParseError::Syntax(
                    "missing operator between operands".to_string(),
                ));
            }
            Element::Value(token.datum, 1)
        } else {
            Element::Op(token.kind)
        };
        if self.stack.len() >= self.options.stack_capacity {
            return Err(ParseError::Overflow(self.options.stack_capacity));
        }
        log::trace!("shift {:?}", element);
        self.stack.push(element);
        Ok(())
    }

    fn reduce(&mut self) -> Result<()> {
        let Some(mut upper) = self.op_below(self.stack.len()) else {
            return Err(ParseError::Syntax("nothing to reduce".to_string()));
        };
        let boundary = loop {
            let Some(lower) = self.op_below(upper) else {
                return Err(ParseError::Syntax("unbalanced expression".to_string()));
            };
            match relation(self.op_at(lower), self.op_at(upper)) {
                Relation::Equal => upper = lower,
                Relation::Less => break lower,
                _ => {
                    return Err(ParseError::Syntax(format!(
                        "'{}' cannot follow '{}'",
                        self.op_at(upper).symbol(),
                        self.op_at(lower).symbol()
                    )));
                }
            }
        };

        let span: Vec<Element> = self.stack.drain(boundary + 1..).collect();
        let depth = span_depth(&span);
        if depth > self.options.max_depth {
            return Err(ParseError::Overflow(self.options.max_depth));
        }
        let node = build(span)?;
        log::trace!("reduce -> {}", node);
        self.stack.push(Element::Value(Datum::Node(node), depth));
        Ok(())
    }
}

/// Depth of the node a span reduces to. Parentheses add no level.
fn span_depth(span: &[Element]) -> usize {
    let deepest = span
        .iter()
        .filter_map(|e| match e {
            Element::Value(_, depth) => Some(*depth),
            Element::Op(_) => None,
        })
        .max()
        .unwrap_or(0);
    match span {
        [Element::Value(..)] | [Element::Op(TokenKind::LParen), _, Element::Op(TokenKind::RParen)] => {
            deepest
        }
        _ => deepest + 1,
    }
}

fn operand(datum: &mut Datum) -> Result<Expr> {
    std::mem::replace(datum, Datum::None)
        .into_expr()
        .ok_or_else(|| ParseError::BadNode("empty operand".to_string()))
}

/// Collapse a reduced span into a single node.
fn build(mut span: Vec<Element>) -> Result<Expr> {
    use Element::{Op, Value};

    let node = match span.as_mut_slice() {
        [Value(d, _)] => operand(d)?,
        [Op(op), Value(d, _)] if op.is_prefix() => {
            let op = UnaryOp::from_token(*op)
                .ok_or_else(|| ParseError::BadNode(format!("'{}' is not unary", op.symbol())))?;
            Expr::unary(op, operand(d)?)
        }
        [Op(TokenKind::LParen), Value(d, _), Op(TokenKind::RParen)] => operand(d)?,
        [Value(f, _), Op(TokenKind::LParen), Value(arg, _), Op(TokenKind::RParen)] => {
            let func = call_name(f)?;
            let mut args = Vec::new();
            flatten_args(operand(arg)?, &mut args);
            Expr::Call { func, args }
        }
        [Value(f, _), Op(TokenKind::LParen), Op(TokenKind::RParen)] => Expr::Call {
            func: call_name(f)?,
            args: Vec::new(),
        },
        [Value(l, _), Op(op), Value(r, _)] if op.is_binary() => {
            let op = BinaryOp::from_token(*op)
                .ok_or_else(|| ParseError::BadNode(format!("'{}' is not binary", op.symbol())))?;
            Expr::binary(op, operand(l)?, operand(r)?)
        }
        [
            Value(c, _),
            Op(TokenKind::Cond),
            Value(t, _),
            Op(TokenKind::Colon),
            Value(e, _),
        ] => Expr::Ternary {
            cond: Box::new(operand(c)?),
            then: Box::new(operand(t)?),
            otherwise: Box::new(operand(e)?),
        },
        _ => return Err(ParseError::Syntax("malformed expression".to_string())),
    };
    Ok(node)
}

fn call_name(datum: &mut Datum) -> Result<String> {
    match std::mem::replace(datum, Datum::None) {
        Datum::Name(name) => Ok(name),
        other => Err(ParseError::BadNode(format!(
            "{} is not a function name",
            other
                .into_expr()
                .map(|e| e.to_string())
                .unwrap_or_default()
        ))),
    }
}

/// Unroll the left-leaning comma chain built for `f(a, b, c)`. A parenthesized
/// comma group on the right stays a single argument.
fn flatten_args(expr: Expr, args: &mut Vec<Expr>) {
    match expr {
        Expr::Binary {
            op: BinaryOp::Comma,
            left,
            right,
        } => {
            flatten_args(*left, args);
            args.push(*right);
        }
        other => args.push(other),
    }
}

/// Parse `text` as exactly one expression.
pub fn parse_expression(text: &str) -> Result<Expr> {
    parse_expression_with(text, ParseOptions::default())
}

/// [`parse_expression`] with explicit options.
pub fn parse_expression_with(text: &str, options: ParseOptions) -> Result<Expr> {
    let mut parser = Parser::with_options(text, options);
    let expr = parser.parse()?;
    let rest = parser.residue().trim();
    if !rest.is_empty() {
        return Err(ParseError::Syntax(format!("unexpected trailing text '{rest}'")));
    }
    Ok(expr)
}

/// Parse a `;`-separated list of expressions.
pub fn parse_list(text: &str) -> Result<Vec<Expr>> {
    parse_list_with(text, ParseOptions::default())
}

/// [`parse_list`] with explicit options.
pub fn parse_list_with(text: &str, options: ParseOptions) -> Result<Vec<Expr>> {
    let mut parser = Parser::with_options(text, options);
    let mut list = Vec::new();
    while !parser.residue().trim().is_empty() {
        let before = parser.residue();
        list.push(parser.parse()?);
        let after = parser.residue();
        let consumed = &before[..before.len() - after.len()];
        if !after.trim().is_empty() && !consumed.ends_with(';') {
            return Err(ParseError::Syntax(format!(
                "unexpected trailing text '{}'",
                after.trim()
            )));
        }
    }
    Ok(list)
}
