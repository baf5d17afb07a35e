// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Recursive descent parser for `DEFINE` conditions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or       := and (OR and)*
//! and      := not (AND not)*
//! not      := NOT not | cmp
//! cmp      := add [ cmpop add
//!                 | IS [NOT] NULL
//!                 | [NOT] BETWEEN add AND add
//!                 | [NOT] IN '(' or (',' or)* ')' ]
//! add      := mul (('+' | '-' | '||') mul)*
//! mul      := unary (('*' | '/' | '%') unary)*
//! unary    := '-' unary | '+' unary | primary
//! primary  := number | string | TRUE | FALSE | NULL
//!           | INTERVAL string [unit] | INTERVAL number unit
//!           | CAST '(' or AS type ')'
//!           | name '(' [ '*' | or (',' or)* ] ')'
//!           | name ['.' name]
//!           | '(' or ')'
//! ```

use crate::common::duration::{IntervalLiteral, IntervalUnit};
use crate::error::RewriteError;
use crate::model::expr::{BinaryOp, ColumnRef, CompareOp, Expr, Literal};
use crate::model::Symbol;

/// Parses one `DEFINE` condition into an [`Expr`].
///
/// # Errors
///
/// Returns [`RewriteError::Parse`] with the byte position of the offending
/// token if the condition is malformed.
///
/// # Examples
///
/// ```
/// use prefilter::define::parser::parse_condition;
///
/// let expr = parse_condition("abs(B.x - R.x) <= 2 AND kind = 'ROBBERY'").unwrap();
/// assert_eq!(expr.to_string(), "abs(B.x - R.x) <= 2 AND kind = 'ROBBERY'");
/// ```
pub fn parse_condition(input: &str) -> Result<Expr, RewriteError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    if parser.peek_kind() == &TokenKind::End {
        return Err(RewriteError::parse("empty condition", 0));
    }
    let expr = parser.parse_or()?;
    match parser.peek_kind() {
        TokenKind::End => Ok(expr),
        _ => Err(parser.error_here("unexpected trailing input")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    QuotedIdent(String),
    Number(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    Cmp(CompareOp),
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, RewriteError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        let two = bytes.get(pos + 1).copied();
        let (kind, len) = match c {
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, 1),
            b',' => (TokenKind::Comma, 1),
            b'+' => (TokenKind::Plus, 1),
            b'-' => (TokenKind::Minus, 1),
            b'*' => (TokenKind::Star, 1),
            b'/' => (TokenKind::Slash, 1),
            b'%' => (TokenKind::Percent, 1),
            b'|' if two == Some(b'|') => (TokenKind::Concat, 2),
            b'=' if two == Some(b'=') => (TokenKind::Cmp(CompareOp::Eq), 2),
            b'=' => (TokenKind::Cmp(CompareOp::Eq), 1),
            b'!' if two == Some(b'=') => (TokenKind::Cmp(CompareOp::NotEq), 2),
            b'<' if two == Some(b'>') => (TokenKind::Cmp(CompareOp::NotEq), 2),
            b'<' if two == Some(b'=') => (TokenKind::Cmp(CompareOp::LtEq), 2),
            b'<' => (TokenKind::Cmp(CompareOp::Lt), 1),
            b'>' if two == Some(b'=') => (TokenKind::Cmp(CompareOp::GtEq), 2),
            b'>' => (TokenKind::Cmp(CompareOp::Gt), 1),
            b'.' if two.is_some_and(|b| b.is_ascii_digit()) => {
                let len = scan_number(&bytes[pos..]);
                (TokenKind::Number(input[pos..pos + len].to_string()), len)
            }
            b'.' => (TokenKind::Dot, 1),
            b'\'' => {
                let (value, len) = scan_quoted(&bytes[pos..], b'\'')
                    .ok_or_else(|| RewriteError::parse("unterminated string literal", start))?;
                (TokenKind::Str(value), len)
            }
            b'"' => {
                let (_, len) = scan_quoted(&bytes[pos..], b'"')
                    .ok_or_else(|| RewriteError::parse("unterminated quoted identifier", start))?;
                (TokenKind::QuotedIdent(input[pos..pos + len].to_string()), len)
            }
            c if c.is_ascii_digit() => {
                let len = scan_number(&bytes[pos..]);
                (TokenKind::Number(input[pos..pos + len].to_string()), len)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let len = bytes[pos..]
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                    .count();
                (TokenKind::Ident(input[pos..pos + len].to_string()), len)
            }
            c => {
                return Err(RewriteError::parse(
                    format!("unexpected character '{}'", char::from(c)),
                    start,
                ))
            }
        };
        pos += len;
        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        start: bytes.len(),
        end: bytes.len(),
    });
    Ok(tokens)
}

/// Length of the numeric literal at the start of `bytes` (`12`, `0.5`, `.5`, `1e3`).
fn scan_number(bytes: &[u8]) -> usize {
    let mut len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(len) == Some(&b'.') {
        len += 1;
        len += bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let digits = bytes[exp.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 {
            len = exp + digits;
        }
    }
    len
}

/// Scans a quoted run starting at `bytes[0] == quote`. Doubled quotes are
/// escapes. Returns the unescaped content and the consumed length.
fn scan_quoted(bytes: &[u8], quote: u8) -> Option<(String, usize)> {
    let mut value = Vec::new();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                value.push(quote);
                i += 2;
                continue;
            }
            return Some((String::from_utf8_lossy(&value).into_owned(), i + 1));
        }
        value.push(bytes[i]);
        i += 1;
    }
    None
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_or(&mut self) -> Result<Expr, RewriteError> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("OR") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, RewriteError> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("AND") {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, RewriteError> {
        if self.eat_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, RewriteError> {
        let lhs = self.parse_additive()?;

        if let TokenKind::Cmp(op) = *self.peek_kind() {
            self.advance();
            let rhs = self.parse_additive()?;
            return Ok(Expr::compare(op, lhs, rhs));
        }

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(lhs),
                negated,
            });
        }

        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("BETWEEN") {
            let low = self.parse_additive()?;
            self.expect_keyword("AND")?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                expr: Box::new(lhs),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.eat_keyword("IN") {
            self.expect(&TokenKind::LParen, "'('")?;
            let list = self.parse_list()?;
            return Ok(Expr::InList {
                expr: Box::new(lhs),
                list,
                negated,
            });
        }
        if negated {
            return Err(self.error_here("expected BETWEEN or IN after NOT"));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, RewriteError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Concat => BinaryOp::Concat,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, RewriteError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, RewriteError> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, RewriteError> {
        let token = self.tokens[self.pos].clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::QuotedIdent(name) => {
                self.advance();
                self.parse_name(name, true)
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.to_ascii_uppercase().as_str() {
                    "TRUE" => Ok(Expr::Literal(Literal::Bool(true))),
                    "FALSE" => Ok(Expr::Literal(Literal::Bool(false))),
                    "NULL" => Ok(Expr::Literal(Literal::Null)),
                    "INTERVAL" => self.parse_interval(token.start),
                    "CAST" if self.peek_kind() == &TokenKind::LParen => self.parse_cast(),
                    "AND" | "OR" | "NOT" | "IS" | "IN" | "BETWEEN" | "AS" => Err(
                        RewriteError::parse(format!("unexpected keyword {name}"), token.start),
                    ),
                    _ => self.parse_name(name, false),
                }
            }
            TokenKind::End => Err(RewriteError::parse(
                "unexpected end of condition",
                token.start,
            )),
            _ => Err(RewriteError::parse(
                format!("unexpected '{}'", &self.input[token.start..token.end]),
                token.start,
            )),
        }
    }

    /// After a leading name: function call, qualified column or bare column.
    fn parse_name(&mut self, name: String, quoted: bool) -> Result<Expr, RewriteError> {
        match self.peek_kind() {
            TokenKind::LParen if !quoted => {
                self.advance();
                let args = if self.peek_kind() == &TokenKind::Star {
                    self.advance();
                    self.expect(&TokenKind::RParen, "')'")?;
                    vec![Expr::Star]
                } else {
                    self.parse_list()?
                };
                Ok(Expr::Call { name, args })
            }
            TokenKind::Dot => {
                self.advance();
                let column = match self.peek_kind().clone() {
                    TokenKind::Ident(c) | TokenKind::QuotedIdent(c) => {
                        self.advance();
                        c
                    }
                    _ => return Err(self.error_here("expected column name after '.'")),
                };
                let symbol = if quoted {
                    Symbol::new(name.trim_matches('"'))
                } else {
                    Symbol::new(&name)
                };
                Ok(Expr::Column(ColumnRef::qualified(symbol, column)))
            }
            _ => Ok(Expr::Column(ColumnRef::bare(name))),
        }
    }

    /// Comma-separated expressions up to and including the closing `)`.
    fn parse_list(&mut self) -> Result<Vec<Expr>, RewriteError> {
        let mut items = Vec::new();
        if self.peek_kind() == &TokenKind::RParen {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            match self.peek_kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    return Ok(items);
                }
                _ => return Err(self.error_here("expected ',' or ')'")),
            }
        }
    }

    /// `INTERVAL '30' MINUTE`, `INTERVAL '30 minutes'` or `INTERVAL 30 MINUTE`.
    fn parse_interval(&mut self, start: usize) -> Result<Expr, RewriteError> {
        let amount = match self.peek_kind().clone() {
            TokenKind::Str(s) | TokenKind::Number(s) => {
                self.advance();
                s
            }
            _ => return Err(self.error_here("expected interval amount")),
        };

        let unit = match self.peek_kind() {
            TokenKind::Ident(word) => IntervalUnit::parse_unit_str(word),
            _ => None,
        };
        let (amount, unit) = if let Some(unit) = unit {
            self.advance();
            (amount.trim().to_string(), unit)
        } else {
            // Unit inside the string: '30 minutes'
            let mut parts = amount.split_whitespace();
            match (parts.next(), parts.next().and_then(IntervalUnit::parse_unit_str), parts.next()) {
                (Some(n), Some(unit), None) => (n.to_string(), unit),
                _ => return Err(RewriteError::parse("expected interval unit", start)),
            }
        };
        Ok(Expr::Literal(Literal::Interval(IntervalLiteral::new(
            amount, unit,
        ))))
    }

    /// `CAST(expr AS type)`; the type is kept as written.
    fn parse_cast(&mut self) -> Result<Expr, RewriteError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let expr = self.parse_or()?;
        self.expect_keyword("AS")?;

        let type_start = self.tokens[self.pos].start;
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => break,
                TokenKind::RParen => depth -= 1,
                TokenKind::End => return Err(self.error_here("expected ')' after CAST type")),
                _ => {}
            }
            self.advance();
        }
        let type_end = self.tokens[self.pos].start;
        let ty = self.input[type_start..type_end].trim().to_string();
        if ty.is_empty() {
            return Err(self.error_here("expected type name"));
        }
        self.advance();
        Ok(Expr::Cast {
            expr: Box::new(expr),
            ty,
        })
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek_kind() {
            TokenKind::Ident(word) if word.eq_ignore_ascii_case(keyword) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), RewriteError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {keyword}")))
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), RewriteError> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {what}")))
        }
    }

    fn error_here(&self, message: &str) -> RewriteError {
        let token = &self.tokens[self.pos];
        let found = if token.kind == TokenKind::End {
            "end of condition"
        } else {
            &self.input[token.start..token.end]
        };
        RewriteError::parse(format!("{message}, got {found}"), token.start)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_operand() -> impl Strategy<Value = String> {
        // Prefixed names never collide with keywords like IN or AS
        prop_oneof![
            "[A-C]\\.c_[a-z]{1,3}",
            "c_[a-z]{1,3}",
            "[0-9]{1,3}",
            "'[a-z]{0,4}'",
        ]
    }

    proptest! {
        #[test]
        fn rendering_is_a_fixed_point(
            lhs in arb_operand(),
            rhs in arb_operand(),
            op in prop::sample::select(vec!["=", "<>", "<", "<=", ">", ">="]),
            arith in prop::sample::select(vec!["+", "-", "*", "/"]),
            extra in arb_operand(),
        ) {
            let input = format!("{lhs} {arith} {extra} {op} {rhs} AND NOT {lhs} {op} {rhs}");
            let rendered = parse_condition(&input).unwrap().to_string();
            let reparsed = parse_condition(&rendered).unwrap();
            prop_assert_eq!(reparsed.to_string(), rendered);
        }

        #[test]
        fn parser_never_panics(input in "[ a-zA-Z0-9_.'\"()*+<>=!,%|-]{0,32}") {
            let _ = parse_condition(&input);
        }
    }
}
