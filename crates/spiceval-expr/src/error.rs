//! Error types for spiceval-expr.

use thiserror::Error;

/// Closed set of parser failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The parser stack or the tree depth exceeded its limit.
    Overflow,
    /// The token sequence is not a valid expression.
    Syntax,
    /// A reduction could not build a well-formed node.
    BadNode,
}

impl ErrorCode {
    /// Human-readable description of the failure class.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Overflow => "expression too deeply nested",
            ErrorCode::Syntax => "syntax error",
            ErrorCode::BadNode => "malformed expression node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expression too deeply nested (limit {0})")]
    Overflow(usize),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("malformed expression node: {0}")]
    BadNode(String),
}

impl ParseError {
    /// The failure class of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::Overflow(_) => ErrorCode::Overflow,
            ParseError::Syntax(_) => ErrorCode::Syntax,
            ParseError::BadNode(_) => ErrorCode::BadNode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivideByZero,

    #[error("bad argument to {function}: {message}")]
    BadArgument { function: String, message: String },

    #[error("vector length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("index {index} out of range for vector of length {len}")]
    Index { index: f64, len: usize },

    #[error("unsupported in numeric context: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;
