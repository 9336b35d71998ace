//! Expression tree types.

use crate::token::TokenKind;

/// Expression tree node. Children are exclusively owned by their parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric constant.
    Number(f64),
    /// Reference to a named parameter, constant or vector.
    Name(String),
    /// String literal, or a node name inside a probe call such as `v(out)`.
    Str(String),
    /// Prefix operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Infix operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function or probe call.
    Call { func: String, args: Vec<Expr> },
    /// `cond ? then : otherwise`.
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    /// `v[i]`.
    Index,
    /// `v[[lo, hi]]`.
    Range,
    /// Argument separator; only survives outside of calls.
    Comma,
}

impl BinaryOp {
    /// Resolve the operator for an infix token.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Times => BinaryOp::Mul,
            TokenKind::Divide => BinaryOp::Div,
            TokenKind::Mod => BinaryOp::Mod,
            TokenKind::Power => BinaryOp::Pow,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            TokenKind::Index => BinaryOp::Index,
            TokenKind::Range => BinaryOp::Range,
            TokenKind::Comma => BinaryOp::Comma,
            _ => return None,
        })
    }

    /// The token class this operator was parsed from.
    pub fn token(self) -> TokenKind {
        match self {
            BinaryOp::Add => TokenKind::Plus,
            BinaryOp::Sub => TokenKind::Minus,
            BinaryOp::Mul => TokenKind::Times,
            BinaryOp::Div => TokenKind::Divide,
            BinaryOp::Mod => TokenKind::Mod,
            BinaryOp::Pow => TokenKind::Power,
            BinaryOp::Eq => TokenKind::Eq,
            BinaryOp::Ne => TokenKind::Ne,
            BinaryOp::Gt => TokenKind::Gt,
            BinaryOp::Lt => TokenKind::Lt,
            BinaryOp::Ge => TokenKind::Ge,
            BinaryOp::Le => TokenKind::Le,
            BinaryOp::And => TokenKind::And,
            BinaryOp::Or => TokenKind::Or,
            BinaryOp::Index => TokenKind::Index,
            BinaryOp::Range => TokenKind::Range,
            BinaryOp::Comma => TokenKind::Comma,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::UMinus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn token(self) -> TokenKind {
        match self {
            UnaryOp::Neg => TokenKind::UMinus,
            UnaryOp::Not => TokenKind::Not,
        }
    }
}

/// Names that switch the lexer into probe-argument mode when followed by `(`.
pub const PROBE_FUNCTIONS: &[&str] = &[
    "v", "vm", "vp", "vr", "vi", "vdb", "i", "im", "ip", "ir", "ii", "idb",
];

/// True if `name` is a voltage/current probe function.
pub fn is_probe_function(name: &str) -> bool {
    PROBE_FUNCTIONS
        .iter()
        .any(|probe| probe.eq_ignore_ascii_case(name))
}

impl Expr {
    /// Token class of this node's own operator, as seen by the printer.
    pub fn token(&self) -> TokenKind {
        match self {
            Expr::Unary { op, .. } => op.token(),
            Expr::Binary { op, .. } => op.token(),
            Expr::Ternary { .. } => TokenKind::Cond,
            Expr::Number(_) | Expr::Name(_) | Expr::Str(_) | Expr::Call { .. } => {
                TokenKind::Value
            }
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// True for `v(...)`/`i(...)` style calls.
    pub fn is_probe(&self) -> bool {
        matches!(self, Expr::Call { func, .. } if is_probe_function(func))
    }

    /// True if the tree references nothing but literals.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Number(_) | Expr::Str(_) => true,
            Expr::Name(_) => false,
            Expr::Unary { operand, .. } => operand.is_constant(),
            Expr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::Call { args, .. } => !self.is_probe() && args.iter().all(Expr::is_constant),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => cond.is_constant() && then.is_constant() && otherwise.is_constant(),
        }
    }

    /// Every name and probe referenced by the tree, sorted and deduplicated.
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs.sort();
        refs.dedup();
        refs
    }

    fn collect_references(&self, refs: &mut Vec<String>) {
        match self {
            Expr::Name(n) => refs.push(n.to_uppercase()),
            Expr::Call { .. } if self.is_probe() => refs.push(self.to_string().to_uppercase()),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_references(refs),
            Expr::Binary { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_references(refs);
                then.collect_references(refs);
                otherwise.collect_references(refs);
            }
            Expr::Number(_) | Expr::Str(_) => {}
        }
    }
}
