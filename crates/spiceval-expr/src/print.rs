//! Printing expression trees back to source text.
//!
//! Output is minimally parenthesized: a child is wrapped only when the
//! precedence tables say the reparse would otherwise build a different tree.

use std::fmt;

use spiceval_core::units::format_literal;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::ptable::{left_ptable, precedence, right_ptable};
use crate::token::TokenKind;

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) if *v < 0.0 || (*v == 0.0 && v.is_sign_negative()) => {
                write!(f, "({})", format_literal(*v))
            }
            Expr::Number(v) => f.write_str(&format_literal(*v)),
            Expr::Name(name) => f.write_str(name),
            Expr::Str(s) => write!(f, "\"{s}\""),
            Expr::Unary { op, operand } => {
                f.write_str(match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                })?;
                child(f, operand, left_ptable(operand.token(), op.token()))
            }
            Expr::Binary { op, left, right } => {
                let parent = op.token();
                child(f, left, left_ptable(left.token(), parent))?;
                match op {
                    BinaryOp::Index => {
                        write!(f, "[")?;
                        child(f, right, false)?;
                        write!(f, "]")
                    }
                    BinaryOp::Range => {
                        write!(f, "[[")?;
                        child(f, right, false)?;
                        write!(f, "]]")
                    }
                    BinaryOp::Comma => {
                        write!(f, ", ")?;
                        child(f, right, right_ptable(right.token(), parent))
                    }
                    _ => {
                        write!(f, " {} ", binary_symbol(*op))?;
                        child(f, right, right_ptable(right.token(), parent))
                    }
                }
            }
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                let probe = self.is_probe();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match arg {
                        Expr::Str(node) if probe => f.write_str(node)?,
                        // Arguments are comma separated, so a bare comma
                        // operand needs its own parens.
                        _ => child(f, arg, arg.token() == TokenKind::Comma)?,
                    }
                }
                write!(f, ")")
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond_parens = precedence(cond.token()).is_some_and(|p| p <= 2);
                child(f, cond, cond_parens)?;
                write!(f, " ? ")?;
                child(f, then, then.token() == TokenKind::Comma)?;
                write!(f, " : ")?;
                child(f, otherwise, right_ptable(otherwise.token(), TokenKind::Cond))
            }
        }
    }
}

fn child(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Gt => ">",
        BinaryOp::Lt => "<",
        BinaryOp::Ge => ">=",
        BinaryOp::Le => "<=",
        BinaryOp::And => "&",
        BinaryOp::Or => "|",
        BinaryOp::Index => "[",
        BinaryOp::Range => "[[",
        BinaryOp::Comma => ",",
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_expression;

    fn reprint(input: &str) -> String {
        parse_expression(input).unwrap().to_string()
    }

    #[test]
    fn test_minimal_parentheses() {
        assert_eq!(reprint("(2+3)*4"), "(2 + 3) * 4");
        assert_eq!(reprint("2+(3*4)"), "2 + 3 * 4");
        assert_eq!(reprint("a-(b-c)"), "a - (b - c)");
        assert_eq!(reprint("(a-b)-c"), "a - b - c");
        assert_eq!(reprint("(2^3)^2"), "(2 ^ 3) ^ 2");
        assert_eq!(reprint("2^(3^2)"), "2 ^ 3 ^ 2");
        assert_eq!(reprint("(-2)^2"), "(-2) ^ 2");
        assert_eq!(reprint("-(2^2)"), "-2 ^ 2");
        assert_eq!(reprint("-(a+b)"), "-(a + b)");
        assert_eq!(reprint("a*-b"), "a * -b");
        assert_eq!(reprint("(a+b)[1]"), "(a + b)[1]");
    }

    #[test]
    fn test_operator_spelling() {
        assert_eq!(reprint("a ne b"), "a <> b");
        assert_eq!(reprint("a != b"), "a <> b");
        assert_eq!(reprint("~a && b"), "!a & b");
        assert_eq!(reprint("a**2"), "a ^ 2");
        assert_eq!(reprint("v[[1,3]]"), "v[[1, 3]]");
    }

    #[test]
    fn test_calls_and_strings() {
        assert_eq!(reprint("max(a,(b,c))"), "max(a, (b, c))");
        assert_eq!(reprint("v(out,0)"), "v(out, 0)");
        assert_eq!(reprint("\"text\""), "\"text\"");
        assert_eq!(reprint("f()"), "f()");
    }

    #[test]
    fn test_ternary_printing() {
        assert_eq!(reprint("a ? b : c ? d : e"), "a ? b : c ? d : e");
        assert_eq!(reprint("(a ? b : c) ? d : e"), "(a ? b : c) ? d : e");
        assert_eq!(reprint("(a ? b : c) + 1"), "(a ? b : c) + 1");
        assert_eq!(reprint("x > 1 ? x * 2 : -x"), "x > 1 ? x * 2 : -x");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(reprint("1.5"), "1.5");
        assert_eq!(reprint("10k"), "10000");
        assert_eq!(reprint("2.5u"), "2.5e-6");
    }
}
