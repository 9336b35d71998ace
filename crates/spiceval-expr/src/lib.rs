//! SPICE expression parsing and evaluation for spiceval.
//!
//! This crate provides:
//! - A stateful lexer with SPICE operator aliases and probe-call syntax
//! - An operator-precedence (shift/reduce) parser driven by [`ptable`]
//! - Minimal-parenthesis printing of expression trees
//! - A pluggable evaluator with built-in constants, functions and vectors

pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
mod print;
pub mod ptable;
pub mod token;

pub use ast::{BinaryOp, Expr, PROBE_FUNCTIONS, UnaryOp, is_probe_function};
pub use error::{ErrorCode, EvalError, ParseError, Result};
pub use eval::{EvalContext, Evaluate, Evaluation, Value, constant};
pub use functions::{MAX_VECTOR_LEN, eval_function};
pub use lexer::Lexer;
pub use parser::{
    ParseOptions, Parser, parse_expression, parse_expression_with, parse_list, parse_list_with,
};
pub use ptable::{Relation, left_ptable, relation, right_ptable};
pub use token::{Datum, Token, TokenKind};
