//! Expression lexer.
//!
//! The lexer is stateful: whether `-` is negation, whether `gt` is an
//! operator or a name, and whether `:` closes a conditional all depend on
//! what came before. Probe calls such as `v(out, ref)` switch it into a raw
//! mode where arguments are node names rather than expressions.

use spiceval_core::units::{UnitChars, scan_number_with};

use crate::ast::is_probe_function;
use crate::token::{Datum, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeMode {
    Off,
    /// A probe name was returned; `(` comes next.
    Open,
    /// Inside the argument list.
    Args,
}

/// Tokenizer over a single expression source.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Start of the most recently returned token.
    token_start: usize,
    prev: TokenKind,
    cond_depth: usize,
    /// `true` entries are `[[`, `false` entries are `[`.
    brackets: Vec<bool>,
    implicit_lparen: bool,
    probe: ProbeMode,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            token_start: 0,
            prev: TokenKind::End,
            cond_depth: 0,
            brackets: Vec::new(),
            implicit_lparen: false,
            probe: ProbeMode::Off,
        }
    }

    /// Unconsumed input.
    pub fn residue(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Push the most recently returned token back onto the input.
    pub fn unread(&mut self) {
        self.pos = self.token_start;
    }

    /// Forget context carried over from a previous expression.
    pub fn reset(&mut self) {
        self.prev = TokenKind::End;
        self.cond_depth = 0;
        self.brackets.clear();
        self.implicit_lparen = false;
        self.probe = ProbeMode::Off;
    }

    /// True if the next token is expected to start an operand.
    fn operand_expected(&self) -> bool {
        !matches!(self.prev, TokenKind::Value | TokenKind::RParen)
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        let token = self.lex();
        self.prev = token.kind;
        token
    }

    fn lex(&mut self) -> Token {
        if self.implicit_lparen {
            self.implicit_lparen = false;
            self.token_start = self.pos;
            return Token::op(TokenKind::LParen);
        }
        if self.probe != ProbeMode::Off {
            return self.lex_probe();
        }

        loop {
            self.skip_blanks();
            self.token_start = self.pos;
            let Some(c) = self.peek() else {
                return Token::end();
            };

            // Unary plus is a no-op.
            if c == b'+' && self.operand_expected() {
                self.pos += 1;
                continue;
            }

            return match c {
                b';' => {
                    self.pos += 1;
                    Token::end()
                }
                b'0'..=b'9' => self.lex_number(),
                b'.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.lex_number(),
                b'"' => self.lex_string(),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),
                _ => self.lex_operator(c),
            };
        }
    }

    fn lex_number(&mut self) -> Token {
        match scan_number_with(&self.input[self.pos..], false, UnitChars::Word) {
            Some(scan) => {
                self.pos += scan.len;
                Token::value(Datum::Number(scan.value))
            }
            None => Token::end(),
        }
    }

    fn lex_string(&mut self) -> Token {
        let body = &self.input[self.pos + 1..];
        match body.find('"') {
            Some(close) => {
                self.pos += close + 2;
                Token::value(Datum::Text(body[..close].to_string()))
            }
            // Unterminated; leave the cursor on the quote.
            None => Token::end(),
        }
    }

    fn is_word_char(&self, c: u8) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(c, b'_' | b'.' | b'$' | b'#')
            || (c == b':' && self.cond_depth == 0)
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| self.is_word_char(c)) {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];

        if self.operand_expected() {
            if word.eq_ignore_ascii_case("not") {
                return Token::op(TokenKind::Not);
            }
        } else if let Some(kind) = word_operator(word) {
            return Token::op(kind);
        }

        if self.peek() == Some(b'(') && is_probe_function(word) {
            self.probe = ProbeMode::Open;
        }
        Token::value(Datum::Name(word.to_string()))
    }

    fn lex_probe(&mut self) -> Token {
        self.skip_blanks();
        self.token_start = self.pos;
        match (self.probe, self.peek()) {
            (_, None) => {
                self.probe = ProbeMode::Off;
                Token::end()
            }
            (ProbeMode::Open, Some(_)) => {
                self.pos += 1;
                self.probe = ProbeMode::Args;
                Token::op(TokenKind::LParen)
            }
            (_, Some(b')')) => {
                self.pos += 1;
                self.probe = ProbeMode::Off;
                Token::op(TokenKind::RParen)
            }
            (_, Some(b',')) => {
                self.pos += 1;
                Token::op(TokenKind::Comma)
            }
            // Whitespace-separated node names get an implied comma.
            (_, Some(_)) if self.prev == TokenKind::Value => Token::op(TokenKind::Comma),
            (_, Some(_)) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !matches!(c, b' ' | b'\t' | b',' | b')'))
                {
                    self.pos += 1;
                }
                Token::value(Datum::Text(self.input[start..self.pos].to_string()))
            }
        }
    }

    fn lex_operator(&mut self, c: u8) -> Token {
        let next = self.peek_at(1);
        let (kind, len) = match c {
            b'+' => (TokenKind::Plus, 1),
            b'-' if self.operand_expected() => (TokenKind::UMinus, 1),
            b'-' => (TokenKind::Minus, 1),
            b'*' if next == Some(b'*') => (TokenKind::Power, 2),
            b'*' => (TokenKind::Times, 1),
            b'^' => (TokenKind::Power, 1),
            b'/' => (TokenKind::Divide, 1),
            b'%' => (TokenKind::Mod, 1),
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, 1),
            b',' => (TokenKind::Comma, 1),
            b'?' => {
                self.cond_depth += 1;
                (TokenKind::Cond, 1)
            }
            b':' if self.cond_depth > 0 => {
                self.cond_depth -= 1;
                (TokenKind::Colon, 1)
            }
            b'<' if next == Some(b'=') => (TokenKind::Le, 2),
            b'<' => match self.blank_then(1, b'>') {
                Some(len) => (TokenKind::Ne, len),
                None => (TokenKind::Lt, 1),
            },
            b'>' if next == Some(b'=') => (TokenKind::Ge, 2),
            b'>' => match self.blank_then(1, b'<') {
                Some(len) => (TokenKind::Ne, len),
                None => (TokenKind::Gt, 1),
            },
            b'=' if next == Some(b'=') => (TokenKind::Eq, 2),
            b'=' => (TokenKind::Eq, 1),
            b'!' if next == Some(b'=') => (TokenKind::Ne, 2),
            b'!' | b'~' => (TokenKind::Not, 1),
            b'&' if next == Some(b'&') => (TokenKind::And, 2),
            b'&' => (TokenKind::And, 1),
            b'|' if next == Some(b'|') => (TokenKind::Or, 2),
            b'|' => (TokenKind::Or, 1),
            b'[' if next == Some(b'[') => {
                self.brackets.push(true);
                self.implicit_lparen = true;
                (TokenKind::Range, 2)
            }
            b'[' => {
                self.brackets.push(false);
                self.implicit_lparen = true;
                (TokenKind::Index, 1)
            }
            b']' => {
                let double = self.brackets.pop().unwrap_or(next == Some(b']'));
                let len = if double && next == Some(b']') { 2 } else { 1 };
                (TokenKind::RParen, len)
            }
            // Unrecognized; the cursor stays on it.
            _ => return Token::end(),
        };
        self.pos += len;
        Token::op(kind)
    }

    /// Length of the run from `offset` over blanks up to and including
    /// `target`, if `target` is the first non-blank character.
    fn blank_then(&self, offset: usize, target: u8) -> Option<usize> {
        let mut len = offset;
        while matches!(self.peek_at(len), Some(b' ' | b'\t')) {
            len += 1;
        }
        (self.peek_at(len) == Some(target)).then_some(len + 1)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields tokens up to, not including, the first `End`.
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (!token.is_end()).then_some(token)
    }
}

/// Word spellings of binary operators, valid only after an operand.
fn word_operator(word: &str) -> Option<TokenKind> {
    let kind = match word.to_ascii_lowercase().as_str() {
        "gt" => TokenKind::Gt,
        "lt" => TokenKind::Lt,
        "ge" => TokenKind::Ge,
        "le" => TokenKind::Le,
        "ne" => TokenKind::Ne,
        "eq" => TokenKind::Eq,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    use TokenKind::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(kinds("1 + 2*3"), vec![Value, Plus, Value, Times, Value]);
        assert_eq!(kinds("a**2"), vec![Value, Power, Value]);
        assert_eq!(kinds("a^2 % 3 / 4"), vec![Value, Power, Value, Mod, Value, Divide, Value]);
    }

    #[test]
    fn test_unary_minus_depends_on_previous_token() {
        assert_eq!(kinds("-a"), vec![UMinus, Value]);
        assert_eq!(kinds("a-b"), vec![Value, Minus, Value]);
        assert_eq!(kinds("(a)-b"), vec![LParen, Value, RParen, Minus, Value]);
        assert_eq!(kinds("a*-b"), vec![Value, Times, UMinus, Value]);
    }

    #[test]
    fn test_unary_plus_is_skipped() {
        assert_eq!(kinds("+a"), vec![Value]);
        assert_eq!(kinds("a*+b"), vec![Value, Times, Value]);
    }

    #[test]
    fn test_relational_aliases() {
        assert_eq!(kinds("a<>b"), vec![Value, Ne, Value]);
        assert_eq!(kinds("a><b"), vec![Value, Ne, Value]);
        assert_eq!(kinds("a < > b"), vec![Value, Ne, Value]);
        assert_eq!(kinds("a > < b"), vec![Value, Ne, Value]);
        assert_eq!(kinds("a != b"), vec![Value, Ne, Value]);
        assert_eq!(kinds("a = b"), vec![Value, Eq, Value]);
        assert_eq!(kinds("a == b"), vec![Value, Eq, Value]);
        assert_eq!(kinds("a <= b >= c"), vec![Value, Le, Value, Ge, Value]);
        assert_eq!(kinds("a && b || !c"), vec![Value, And, Value, Or, Not, Value]);
        assert_eq!(kinds("~a & b | c"), vec![Not, Value, And, Value, Or, Value]);
    }

    #[test]
    fn test_word_operators_only_after_a_value() {
        assert_eq!(kinds("a gt b"), vec![Value, Gt, Value]);
        assert_eq!(kinds("a AND b or c"), vec![Value, And, Value, Or, Value]);
        // In operand position these are plain names.
        assert_eq!(kinds("gt + 1"), vec![Value, Plus, Value]);
        assert_eq!(kinds("not a"), vec![Not, Value]);
        assert_eq!(kinds("a not"), vec![Value, Value]);
    }

    #[test]
    fn test_brackets_insert_implicit_paren() {
        assert_eq!(kinds("a[1]"), vec![Value, Index, LParen, Value, RParen]);
        assert_eq!(
            kinds("a[[1,2]]"),
            vec![Value, Range, LParen, Value, Comma, Value, RParen]
        );
        assert_eq!(
            kinds("a[b[1]]"),
            vec![Value, Index, LParen, Value, Index, LParen, Value, RParen, RParen]
        );
    }

    #[test]
    fn test_colon_depends_on_conditional_depth() {
        assert_eq!(kinds("a ? b : c"), vec![Value, Cond, Value, Colon, Value]);

        let mut lexer = Lexer::new("lib:x + 1");
        let token = lexer.next_token();
        assert_eq!(token.datum, Datum::Name("lib:x".into()));
    }

    #[test]
    fn test_probe_arguments_are_raw() {
        let tokens: Vec<Token> = Lexer::new("v(out, 0) + i(vdd)").collect();
        assert_eq!(tokens[0].datum, Datum::Name("v".into()));
        assert_eq!(tokens[1].kind, LParen);
        assert_eq!(tokens[2].datum, Datum::Text("out".into()));
        assert_eq!(tokens[3].kind, Comma);
        assert_eq!(tokens[4].datum, Datum::Text("0".into()));
        assert_eq!(tokens[5].kind, RParen);
        assert_eq!(tokens[6].kind, Plus);
        assert_eq!(tokens[9].datum, Datum::Text("vdd".into()));
    }

    #[test]
    fn test_probe_whitespace_separated_nodes() {
        let tokens: Vec<Token> = Lexer::new("vdb(a b)").collect();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Value, LParen, Value, Comma, Value, RParen]);
        assert_eq!(tokens[4].datum, Datum::Text("b".into()));
    }

    #[test]
    fn test_probe_name_without_paren_is_a_name() {
        assert_eq!(kinds("v + 1"), vec![Value, Plus, Value]);
        assert_eq!(kinds("v (a+1)"), vec![Value, LParen, Value, Plus, Value, RParen]);
    }

    #[test]
    fn test_numbers_and_strings() {
        let tokens: Vec<Token> = Lexer::new("10k \"hello\" .5").collect();
        assert_eq!(tokens[0].datum, Datum::Number(10e3));
        assert_eq!(tokens[1].datum, Datum::Text("hello".into()));
        assert_eq!(tokens[2].datum, Datum::Number(0.5));
    }

    #[test]
    fn test_semicolon_ends_and_is_consumed() {
        let mut lexer = Lexer::new("a; b");
        assert_eq!(lexer.next_token().kind, Value);
        assert!(lexer.next_token().is_end());
        assert_eq!(lexer.residue(), " b");
    }

    #[test]
    fn test_unknown_character_is_not_consumed() {
        let mut lexer = Lexer::new("a @ b");
        assert_eq!(lexer.next_token().kind, Value);
        assert!(lexer.next_token().is_end());
        assert_eq!(lexer.residue(), "@ b");
    }

    #[test]
    fn test_unterminated_string_ends_stream() {
        let mut lexer = Lexer::new("\"abc");
        assert!(lexer.next_token().is_end());
        assert_eq!(lexer.residue(), "\"abc");
    }
}
