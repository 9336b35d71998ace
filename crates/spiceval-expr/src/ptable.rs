//! Operator precedence tables.
//!
//! [`relation`] drives the shift/reduce parser. [`left_ptable`] and
//! [`right_ptable`] drive the printer: they answer whether a child subtree
//! needs parentheses to reparse into the same tree.
//!
//! Binding strength, loosest first:
//!
//! | level | operators             | associativity |
//! |-------|-----------------------|---------------|
//! | 1     | `,`                   | left          |
//! | 2     | `? :`                 | right         |
//! | 3     | `\|`                  | left          |
//! | 4     | `&`                   | left          |
//! | 5     | `= <> < > <= >=`      | left          |
//! | 6     | `+ -`                 | left          |
//! | 7     | `* / %`               | left          |
//! | 8     | unary `-` and `!`     | prefix        |
//! | 9     | `^`                   | right         |
//! | 10    | `[ ]` and `[[ ]]`     | left          |

use crate::token::TokenKind;

/// Outcome of comparing the operator on top of the stack with the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Reduce the top of the stack.
    Greater,
    /// Shift the next token.
    Less,
    /// Shift; the two tokens belong to the same construct.
    Equal,
    /// The next token cannot follow.
    Error,
}

/// Binding level of an operator, `None` for non-operators.
pub fn precedence(kind: TokenKind) -> Option<u8> {
    let level = match kind {
        TokenKind::Comma => 1,
        TokenKind::Cond | TokenKind::Colon => 2,
        TokenKind::Or => 3,
        TokenKind::And => 4,
        TokenKind::Eq
        | TokenKind::Ne
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::Le
        | TokenKind::Ge => 5,
        TokenKind::Plus | TokenKind::Minus => 6,
        TokenKind::Times | TokenKind::Divide | TokenKind::Mod => 7,
        TokenKind::UMinus | TokenKind::Not => 8,
        TokenKind::Power => 9,
        TokenKind::Index | TokenKind::Range => 10,
        _ => return None,
    };
    Some(level)
}

/// True for operators that group right to left.
pub fn right_assoc(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Power | TokenKind::Cond | TokenKind::Colon)
}

fn starts_operand(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Value | TokenKind::LParen) || kind.is_prefix()
}

/// Compare the topmost stack operator with the incoming token.
pub fn relation(top: TokenKind, next: TokenKind) -> Relation {
    use Relation::*;

    if top == TokenKind::RParen {
        return if starts_operand(next) { Error } else { Greater };
    }
    if starts_operand(next) {
        return Less;
    }

    match top {
        TokenKind::End => match next {
            TokenKind::End => Equal,
            TokenKind::RParen | TokenKind::Colon => Error,
            _ => Less,
        },
        TokenKind::LParen => match next {
            TokenKind::RParen => Equal,
            TokenKind::End | TokenKind::Colon => Error,
            _ => Less,
        },
        TokenKind::Cond => match next {
            TokenKind::Colon => Equal,
            TokenKind::Cond => Less,
            TokenKind::Comma | TokenKind::RParen | TokenKind::End => Error,
            _ if precedence(next).is_some_and(|p| p > 2) => Less,
            _ => Error,
        },
        TokenKind::Colon => match next {
            TokenKind::Cond => Less,
            TokenKind::Colon | TokenKind::Comma | TokenKind::RParen | TokenKind::End => Greater,
            _ if precedence(next).is_some_and(|p| p > 2) => Less,
            _ => Error,
        },
        TokenKind::Comma if next == TokenKind::Colon => Error,
        _ => match (precedence(top), next) {
            (None, _) => Error,
            (Some(_), TokenKind::End | TokenKind::RParen | TokenKind::Colon) => Greater,
            (Some(p), _) => match precedence(next) {
                Some(q) if p > q => Greater,
                Some(q) if p < q => Less,
                Some(_) if right_assoc(next) => Less,
                Some(_) => Greater,
                None => Error,
            },
        },
    }
}

/// True if a left child whose top operator is `child` must be parenthesized
/// under `parent`.
pub fn left_ptable(child: TokenKind, parent: TokenKind) -> bool {
    let (Some(c), Some(p)) = (precedence(child), precedence(parent)) else {
        return false;
    };
    if child.is_prefix() {
        return p > 8;
    }
    c < p || (c == p && right_assoc(parent))
}

/// True if a right child whose top operator is `child` must be parenthesized
/// under `parent`.
pub fn right_ptable(child: TokenKind, parent: TokenKind) -> bool {
    let (Some(c), Some(p)) = (precedence(child), precedence(parent)) else {
        return false;
    };
    if child.is_prefix() || matches!(parent, TokenKind::Index | TokenKind::Range) {
        return false;
    }
    c < p || (c == p && !right_assoc(parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    #[test]
    fn test_precedence_ordering() {
        assert_eq!(relation(Plus, Times), Relation::Less);
        assert_eq!(relation(Times, Plus), Relation::Greater);
        assert_eq!(relation(Plus, Minus), Relation::Greater);
        assert_eq!(relation(Power, Power), Relation::Less);
        assert_eq!(relation(UMinus, Power), Relation::Less);
        assert_eq!(relation(UMinus, Times), Relation::Greater);
        assert_eq!(relation(Or, And), Relation::Less);
        assert_eq!(relation(Lt, Plus), Relation::Less);
        assert_eq!(relation(Index, Power), Relation::Greater);
    }

    #[test]
    fn test_operands_always_shift_after_operators() {
        for top in [End, Plus, Times, LParen, Cond, Colon, Comma, UMinus, Index] {
            assert_eq!(relation(top, Value), Relation::Less, "{top:?}");
            assert_eq!(relation(top, LParen), Relation::Less, "{top:?}");
            assert_eq!(relation(top, UMinus), Relation::Less, "{top:?}");
        }
        assert_eq!(relation(RParen, Value), Relation::Error);
        assert_eq!(relation(RParen, LParen), Relation::Error);
    }

    #[test]
    fn test_matched_pairs() {
        assert_eq!(relation(LParen, RParen), Relation::Equal);
        assert_eq!(relation(Cond, Colon), Relation::Equal);
        assert_eq!(relation(End, End), Relation::Equal);
        assert_eq!(relation(End, RParen), Relation::Error);
        assert_eq!(relation(LParen, End), Relation::Error);
    }

    #[test]
    fn test_conditional_relations() {
        assert_eq!(relation(Cond, Plus), Relation::Less);
        assert_eq!(relation(Cond, Cond), Relation::Less);
        assert_eq!(relation(Cond, Comma), Relation::Error);
        assert_eq!(relation(Colon, Cond), Relation::Less);
        assert_eq!(relation(Colon, Colon), Relation::Greater);
        assert_eq!(relation(Colon, Comma), Relation::Greater);
        assert_eq!(relation(Plus, Cond), Relation::Greater);
        assert_eq!(relation(Comma, Cond), Relation::Less);
        assert_eq!(relation(Comma, Colon), Relation::Error);
        assert_eq!(relation(Plus, Colon), Relation::Greater);
    }

    #[test]
    fn test_left_ptable() {
        assert!(left_ptable(Plus, Times));
        assert!(!left_ptable(Times, Plus));
        assert!(!left_ptable(Minus, Minus));
        assert!(left_ptable(Power, Power));
        assert!(left_ptable(UMinus, Power));
        assert!(!left_ptable(UMinus, Times));
        assert!(left_ptable(Plus, Index));
        assert!(!left_ptable(Value, Power));
    }

    #[test]
    fn test_right_ptable() {
        assert!(right_ptable(Minus, Minus));
        assert!(right_ptable(Plus, Times));
        assert!(!right_ptable(Times, Plus));
        assert!(!right_ptable(Power, Power));
        assert!(!right_ptable(UMinus, Power));
        assert!(!right_ptable(Plus, Index));
        assert!(right_ptable(Comma, Comma));
    }
}
