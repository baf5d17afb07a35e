// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Recursive descent parser for `PATTERN` bodies.
//!
//! Parses patterns like `(R Z* B Z* M)` into a [`PatternSequence`]. Only
//! concatenations of symbols with an optional `*` quantifier are accepted.
//! Alternation, grouping, other quantifiers, anchors, exclusions and
//! `PERMUTE` are recognized so they can be reported as unsupported rather
//! than as syntax errors.

use crate::error::RewriteError;
use crate::model::{Occurrence, PatternSequence, Quantifier, Symbol};

/// Parses a pattern body into a [`PatternSequence`].
///
/// One pair of enclosing parentheses is accepted, so both `R Z* B` and
/// `(R Z* B)` parse to the same sequence.
///
/// # Errors
///
/// Returns [`RewriteError::Parse`] for malformed or empty input and
/// [`RewriteError::UnsupportedPatternShape`] for valid row-pattern syntax
/// outside the supported subset.
///
/// # Examples
///
/// ```
/// use prefilter::pattern::parser::parse_pattern;
///
/// let pattern = parse_pattern("(R Z* B)").unwrap();
/// assert_eq!(pattern.len(), 3);
/// assert_eq!(pattern.to_string(), "R Z* B");
/// ```
pub fn parse_pattern(input: &str) -> Result<PatternSequence, RewriteError> {
    let mut parser = Parser::new(input);
    let occurrences = parser.parse()?;
    if occurrences.is_empty() {
        return Err(RewriteError::parse("empty pattern", 0));
    }
    Ok(PatternSequence::new(occurrences))
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse(&mut self) -> Result<Vec<Occurrence>, RewriteError> {
        self.skip_whitespace();
        let grouped = self.peek() == Some(b'(');
        if grouped {
            self.advance();
        }

        let mut occurrences = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(b')') if grouped => break,
                Some(_) => occurrences.push(self.parse_occurrence()?),
            }
        }

        if grouped {
            self.expect(b')')?;
            self.skip_whitespace();
            if let Some(c) = self.peek() {
                return Err(match c {
                    b'*' | b'+' | b'?' | b'{' => RewriteError::unsupported(
                        "quantifier on a parenthesized group",
                    ),
                    _ => RewriteError::parse(
                        format!("unexpected character '{}' after pattern", char::from(c)),
                        self.pos,
                    ),
                });
            }
        }
        Ok(occurrences)
    }

    fn parse_occurrence(&mut self) -> Result<Occurrence, RewriteError> {
        let start = self.pos;
        let symbol = match self.peek() {
            Some(b'"') => self.parse_quoted()?,
            Some(c) if is_ident_start(c) => {
                let ident = self.parse_ident();
                if ident.eq_ignore_ascii_case("PERMUTE") {
                    self.skip_whitespace();
                    if self.peek() == Some(b'(') {
                        return Err(RewriteError::unsupported("PERMUTE"));
                    }
                }
                ident
            }
            Some(c) => return Err(self.unexpected(c)),
            None => {
                return Err(RewriteError::parse(
                    "unexpected end of pattern",
                    self.pos,
                ))
            }
        };
        if symbol.is_empty() {
            return Err(RewriteError::parse("empty symbol name", start));
        }

        let quantifier = self.parse_quantifier()?;
        Ok(Occurrence {
            symbol: Symbol::new(&symbol),
            quantifier,
        })
    }

    fn parse_quantifier(&mut self) -> Result<Quantifier, RewriteError> {
        match self.peek() {
            Some(b'*') => {
                self.advance();
                if self.peek() == Some(b'?') {
                    return Err(RewriteError::unsupported("reluctant quantifier '*?'"));
                }
                Ok(Quantifier::ZeroOrMore)
            }
            Some(b'+') => Err(RewriteError::unsupported("quantifier '+'")),
            Some(b'?') => Err(RewriteError::unsupported("quantifier '?'")),
            Some(b'{') => Err(RewriteError::unsupported("bounded quantifier '{n,m}'")),
            _ => Ok(Quantifier::Single),
        }
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn parse_quoted(&mut self) -> Result<String, RewriteError> {
        self.expect(b'"')?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'"' {
                let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.advance();
                return Ok(name);
            }
            self.advance();
        }
        Err(RewriteError::parse("unterminated quoted symbol", start))
    }

    fn unexpected(&self, c: u8) -> RewriteError {
        match c {
            b'|' => RewriteError::unsupported("alternation '|'"),
            b'(' => RewriteError::unsupported("nested group"),
            b'^' | b'$' => RewriteError::unsupported("anchor"),
            b'{' => RewriteError::unsupported("exclusion '{- -}'"),
            b'*' | b'+' | b'?' => RewriteError::parse(
                format!("quantifier '{}' without a symbol", char::from(c)),
                self.pos,
            ),
            _ => RewriteError::parse(
                format!("unexpected character '{}'", char::from(c)),
                self.pos,
            ),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: u8) -> Result<(), RewriteError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(RewriteError::parse(
                format!(
                    "expected '{}', got '{}'",
                    char::from(expected),
                    char::from(c)
                ),
                self.pos,
            )),
            None => Err(RewriteError::parse(
                format!("expected '{}', got end of pattern", char::from(expected)),
                self.pos,
            )),
        }
    }
}

const fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_reparses_to_same_sequence(
            items in prop::collection::vec(("[A-Z][A-Z0-9_]{0,3}", any::<bool>()), 1..8)
        ) {
            let text: Vec<String> = items
                .iter()
                .map(|(s, star)| if *star { format!("{s}*") } else { s.clone() })
                .collect();
            let parsed = parse_pattern(&text.join(" ")).unwrap();
            prop_assert_eq!(parsed.len(), items.len());
            let reparsed = parse_pattern(&parsed.to_string()).unwrap();
            prop_assert_eq!(parsed, reparsed);
        }

        #[test]
        fn parser_never_panics(input in "[ A-Za-z_*+?|(){}^$,\"]{0,24}") {
            let _ = parse_pattern(&input);
        }
    }
}
