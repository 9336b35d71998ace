//! Token types produced by the expression lexer.

use crate::ast::Expr;

/// Token classes understood by the precedence tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input, `;`, or an unrecognized character.
    End,
    Plus,
    Minus,
    Times,
    Mod,
    Divide,
    /// `^` or `**`.
    Power,
    /// Minus in operand position.
    UMinus,
    LParen,
    RParen,
    Comma,
    /// `:` inside a conditional.
    Colon,
    /// `?`.
    Cond,
    /// Any operand: number, name, string or an already reduced node.
    Value,
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
    And,
    Or,
    Not,
    /// `[` (the lexer follows it with an implicit `(`).
    Index,
    /// `[[`.
    Range,
}

impl TokenKind {
    /// Number of token classes.
    pub const COUNT: usize = 25;

    /// True for prefix operators.
    pub fn is_prefix(self) -> bool {
        matches!(self, TokenKind::UMinus | TokenKind::Not)
    }

    /// True for operators that combine two operands.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Times
                | TokenKind::Mod
                | TokenKind::Divide
                | TokenKind::Power
                | TokenKind::Comma
                | TokenKind::Eq
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Ge
                | TokenKind::Le
                | TokenKind::Ne
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Index
                | TokenKind::Range
        )
    }

    /// Source spelling, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::End => "end of input",
            TokenKind::Plus => "+",
            TokenKind::Minus | TokenKind::UMinus => "-",
            TokenKind::Times => "*",
            TokenKind::Mod => "%",
            TokenKind::Divide => "/",
            TokenKind::Power => "^",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Cond => "?",
            TokenKind::Value => "value",
            TokenKind::Eq => "=",
            TokenKind::Gt => ">",
            TokenKind::Lt => "<",
            TokenKind::Ge => ">=",
            TokenKind::Le => "<=",
            TokenKind::Ne => "<>",
            TokenKind::And => "&",
            TokenKind::Or => "|",
            TokenKind::Not => "!",
            TokenKind::Index => "[",
            TokenKind::Range => "[[",
        }
    }
}

/// Payload carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    None,
    Number(f64),
    /// Identifier: a parameter, vector or function name.
    Name(String),
    /// A subtree built by an earlier reduction.
    Node(Expr),
    /// Quoted string or raw probe argument.
    Text(String),
}

impl Datum {
    /// Convert an operand into a tree leaf.
    pub fn into_expr(self) -> Option<Expr> {
        match self {
            Datum::None => None,
            Datum::Number(v) => Some(Expr::Number(v)),
            Datum::Name(n) => Some(Expr::Name(n)),
            Datum::Node(e) => Some(e),
            Datum::Text(s) => Some(Expr::Str(s)),
        }
    }
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub datum: Datum,
}

impl Token {
    pub fn op(kind: TokenKind) -> Self {
        Self {
            kind,
            datum: Datum::None,
        }
    }

    pub fn value(datum: Datum) -> Self {
        Self {
            kind: TokenKind::Value,
            datum,
        }
    }

    pub fn end() -> Self {
        Self::op(TokenKind::End)
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }
}
