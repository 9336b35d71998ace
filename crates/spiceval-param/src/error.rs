//! Error types for spiceval-param.

use spiceval_expr::{EvalError, ParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("recursive definition of parameter {name} = {value}")]
    Cycle { name: String, value: String },

    #[error("missing value for parameter {0}")]
    MissingValue(String),

    #[error("invalid parameter name: {0}")]
    BadName(String),

    #[error("unbalanced brackets in: {0}")]
    Unbalanced(String),

    #[error("parameter {0} is read-only")]
    ReadOnly(String),

    #[error("unterminated quote in: {0}")]
    UnterminatedQuote(String),

    #[error("expression error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, Error>;
