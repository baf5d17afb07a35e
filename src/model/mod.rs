// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Clause model: the typed form of a `MATCH_RECOGNIZE` query.
//!
//! The model is the rewriter's input. It is normally produced by an external
//! SQL parser; [`ClauseModelBuilder`] offers a text front-end for the two
//! clauses the rewriter interprets (`PATTERN` and `DEFINE`) so callers
//! without a full parser can still build one.
//!
//! A model is read-only once built. Structural checks (duplicate symbols,
//! dangling or forward references) run at rewrite time in
//! [`validity::check_model`](crate::validity::check_model), so a model
//! assembled by hand is held to the same rules as a parsed one.

pub mod expr;

use std::fmt;

use crate::define::parser::parse_condition;
use crate::error::RewriteError;
use crate::pattern::parser::parse_pattern;

use self::expr::Expr;

/// A pattern variable name. Stored upper-cased: SQL identifiers in
/// `PATTERN` and `DEFINE` are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol, normalizing the name to upper case.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_ascii_uppercase())
    }

    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Quantifier attached to a symbol occurrence in the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Exactly one row.
    Single,
    /// `*`: zero or more rows.
    ZeroOrMore,
}

/// One `(symbol, quantifier)` element of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The pattern variable.
    pub symbol: Symbol,
    /// Its quantifier.
    pub quantifier: Quantifier,
}

impl Occurrence {
    /// Creates a single-row occurrence.
    #[must_use]
    pub fn single(symbol: &str) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            quantifier: Quantifier::Single,
        }
    }

    /// Creates a zero-or-more occurrence.
    #[must_use]
    pub fn zero_or_more(symbol: &str) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            quantifier: Quantifier::ZeroOrMore,
        }
    }
}

/// A concatenation-only row pattern such as `R Z* B Z* M`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternSequence {
    occurrences: Vec<Occurrence>,
}

impl PatternSequence {
    /// Creates a pattern from its occurrences, in order.
    #[must_use]
    pub const fn new(occurrences: Vec<Occurrence>) -> Self {
        Self { occurrences }
    }

    /// Returns the occurrences in pattern order.
    #[must_use]
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Returns the index of the first occurrence of `symbol`.
    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.occurrences.iter().position(|o| &o.symbol == symbol)
    }

    /// Returns the index of the first occurrence of `symbol` after `after`
    /// (or the first occurrence at all when `after` is `None`).
    ///
    /// A `*` separator may occur several times (`R Z* B Z* M`), so ordering
    /// checks need the next occurrence rather than the first.
    #[must_use]
    pub fn position_after(&self, symbol: &Symbol, after: Option<usize>) -> Option<usize> {
        let from = after.map_or(0, |p| p + 1);
        self.occurrences
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, o)| &o.symbol == symbol)
            .map(|(i, _)| i)
    }

    /// Returns the index of the last occurrence of `symbol`.
    #[must_use]
    pub fn last_position(&self, symbol: &Symbol) -> Option<usize> {
        self.occurrences.iter().rposition(|o| &o.symbol == symbol)
    }

    /// Returns the quantifier of the first occurrence of `symbol`.
    #[must_use]
    pub fn quantifier(&self, symbol: &Symbol) -> Option<Quantifier> {
        self.occurrences
            .iter()
            .find(|o| &o.symbol == symbol)
            .map(|o| o.quantifier)
    }

    /// Returns true if `symbol` occurs in the pattern.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.position(symbol).is_some()
    }

    /// First symbol of the pattern.
    #[must_use]
    pub fn first(&self) -> Option<&Symbol> {
        self.occurrences.first().map(|o| &o.symbol)
    }

    /// Last symbol of the pattern.
    #[must_use]
    pub fn last(&self) -> Option<&Symbol> {
        self.occurrences.last().map(|o| &o.symbol)
    }

    /// Number of occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// Returns true if the pattern has no occurrences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

impl fmt::Display for PatternSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, occ) in self.occurrences.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", occ.symbol)?;
            if occ.quantifier == Quantifier::ZeroOrMore {
                write!(f, "*")?;
            }
        }
        Ok(())
    }
}

/// The `DEFINE` expression of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCondition {
    /// The defined symbol.
    pub symbol: Symbol,
    /// Its boolean condition (conjunction semantics once split).
    pub condition: Expr,
}

/// Typed representation of a `MATCH_RECOGNIZE` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseModel {
    source: String,
    order_by: String,
    partition_by: Vec<String>,
    pattern: PatternSequence,
    conditions: Vec<SymbolCondition>,
    original_clause: String,
}

impl ClauseModel {
    /// Creates a model from already-parsed parts.
    ///
    /// `original_clause` is the body of `MATCH_RECOGNIZE ( ... )`, echoed
    /// verbatim into the rewritten query.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        order_by: impl Into<String>,
        pattern: PatternSequence,
        conditions: Vec<SymbolCondition>,
        original_clause: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            order_by: order_by.into(),
            partition_by: Vec::new(),
            pattern,
            conditions,
            original_clause: original_clause.into(),
        }
    }

    /// Returns a builder for the text front-end.
    #[must_use]
    pub fn builder() -> ClauseModelBuilder {
        ClauseModelBuilder::default()
    }

    /// Sets the `PARTITION BY` columns.
    #[must_use]
    pub fn with_partition_by(mut self, columns: Vec<String>) -> Self {
        self.partition_by = columns;
        self
    }

    /// Relation scanned by the pattern-matching clause.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `ORDER BY` column.
    #[must_use]
    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// The `PARTITION BY` columns (possibly empty).
    #[must_use]
    pub fn partition_by(&self) -> &[String] {
        &self.partition_by
    }

    /// The row pattern.
    #[must_use]
    pub fn pattern(&self) -> &PatternSequence {
        &self.pattern
    }

    /// `DEFINE` conditions in declaration order.
    #[must_use]
    pub fn conditions(&self) -> &[SymbolCondition] {
        &self.conditions
    }

    /// The condition of `symbol`, if it has one.
    #[must_use]
    pub fn condition(&self, symbol: &Symbol) -> Option<&Expr> {
        self.conditions
            .iter()
            .find(|c| &c.symbol == symbol)
            .map(|c| &c.condition)
    }

    /// The unmodified `MATCH_RECOGNIZE` body.
    #[must_use]
    pub fn original_clause(&self) -> &str {
        &self.original_clause
    }
}

/// Builds a [`ClauseModel`] from clause text.
///
/// ```
/// use prefilter::model::ClauseModel;
///
/// let model = ClauseModel::builder()
///     .source("crimes")
///     .order_by("time")
///     .pattern("R Z* B")
///     .define("R", "primary_type = 'ROBBERY'")
///     .define("B", "B.district = R.district")
///     .build()
///     .unwrap();
/// assert_eq!(model.pattern().to_string(), "R Z* B");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClauseModelBuilder {
    source: Option<String>,
    order_by: Option<String>,
    partition_by: Vec<String>,
    pattern: Option<String>,
    defines: Vec<(String, String)>,
    original_clause: Option<String>,
}

impl ClauseModelBuilder {
    /// Relation scanned by the pattern-matching clause.
    #[must_use]
    pub fn source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// The `ORDER BY` column.
    #[must_use]
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    /// Adds a `PARTITION BY` column.
    #[must_use]
    pub fn partition_by(mut self, column: &str) -> Self {
        self.partition_by.push(column.to_string());
        self
    }

    /// The `PATTERN` body, with or without the enclosing parentheses.
    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Adds `symbol AS condition` to `DEFINE`.
    #[must_use]
    pub fn define(mut self, symbol: &str, condition: &str) -> Self {
        self.defines
            .push((symbol.to_string(), condition.to_string()));
        self
    }

    /// The verbatim `MATCH_RECOGNIZE` body. When omitted, one is rendered
    /// from the other clauses.
    #[must_use]
    pub fn original_clause(mut self, clause: &str) -> Self {
        self.original_clause = Some(clause.to_string());
        self
    }

    /// Parses the clause text and assembles the model.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::MissingClause`] if the source, `ORDER BY` or
    /// `PATTERN` is missing, and parse or shape errors from the pattern and
    /// condition parsers.
    pub fn build(self) -> Result<ClauseModel, RewriteError> {
        let source = self
            .source
            .ok_or(RewriteError::MissingClause { clause: "FROM" })?;
        let order_by = self
            .order_by
            .ok_or(RewriteError::MissingClause { clause: "ORDER BY" })?;
        let pattern_text = self
            .pattern
            .ok_or(RewriteError::MissingClause { clause: "PATTERN" })?;
        let pattern = parse_pattern(&pattern_text)?;

        let conditions = self
            .defines
            .iter()
            .map(|(symbol, text)| {
                Ok(SymbolCondition {
                    symbol: Symbol::new(symbol),
                    condition: parse_condition(text)?,
                })
            })
            .collect::<Result<Vec<_>, RewriteError>>()?;

        let original_clause = self.original_clause.unwrap_or_else(|| {
            render_clause(&self.partition_by, &order_by, &pattern, &conditions)
        });

        Ok(ClauseModel {
            source,
            order_by,
            partition_by: self.partition_by,
            pattern,
            conditions,
            original_clause,
        })
    }
}

fn render_clause(
    partition_by: &[String],
    order_by: &str,
    pattern: &PatternSequence,
    conditions: &[SymbolCondition],
) -> String {
    let mut lines = Vec::new();
    if !partition_by.is_empty() {
        lines.push(format!("PARTITION BY {}", partition_by.join(", ")));
    }
    lines.push(format!("ORDER BY {order_by}"));
    lines.push(format!("PATTERN ({pattern})"));
    if !conditions.is_empty() {
        let defines: Vec<String> = conditions
            .iter()
            .map(|c| format!("\t\t{} AS {}", c.symbol, c.condition))
            .collect();
        lines.push(format!("DEFINE\n{}", defines.join(",\n")));
    }
    lines.join("\n\t")
}

/// A caller-chosen, order-preserving selection of pattern symbols.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subsequence {
    symbols: Vec<Symbol>,
}

impl Subsequence {
    /// Creates a subsequence from symbol names.
    #[must_use]
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols.into_iter().map(|s| Symbol::new(s.as_ref())).collect(),
        }
    }

    /// Parses space- or comma-separated symbols, e.g. `"R B"` or `"R,B"`.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self::new(
            input
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty()),
        )
    }

    /// Returns the symbols in order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns true if `symbol` is selected.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Number of selected symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for Subsequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.symbols.iter().map(Symbol::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_case() {
        assert_eq!(Symbol::new("r"), Symbol::new("R"));
        assert_eq!(Symbol::new("down").as_str(), "DOWN");
    }

    #[test]
    fn test_pattern_positions() {
        let p = PatternSequence::new(vec![
            Occurrence::single("R"),
            Occurrence::zero_or_more("Z"),
            Occurrence::single("B"),
        ]);
        assert_eq!(p.position(&Symbol::new("B")), Some(2));
        assert_eq!(p.quantifier(&Symbol::new("Z")), Some(Quantifier::ZeroOrMore));
        assert_eq!(p.first(), Some(&Symbol::new("R")));
        assert_eq!(p.last(), Some(&Symbol::new("B")));
        assert!(!p.contains(&Symbol::new("M")));
        assert_eq!(p.to_string(), "R Z* B");
    }

    #[test]
    fn test_repeated_separator_positions() {
        let p = PatternSequence::new(vec![
            Occurrence::single("R"),
            Occurrence::zero_or_more("Z"),
            Occurrence::single("B"),
            Occurrence::zero_or_more("Z"),
            Occurrence::single("M"),
        ]);
        let z = Symbol::new("Z");
        assert_eq!(p.position(&z), Some(1));
        assert_eq!(p.last_position(&z), Some(3));
        assert_eq!(p.position_after(&z, None), Some(1));
        assert_eq!(p.position_after(&z, Some(1)), Some(3));
        assert_eq!(p.position_after(&z, Some(3)), None);
    }

    #[test]
    fn test_subsequence_parse_formats() {
        let expected = Subsequence::new(["R", "B", "M"]);
        assert_eq!(Subsequence::parse("R B M"), expected);
        assert_eq!(Subsequence::parse("r,b,m"), expected);
        assert_eq!(Subsequence::parse(" R , B  M "), expected);
        assert!(Subsequence::parse(" , ").is_empty());
    }

    #[test]
    fn test_builder_requires_clauses() {
        let err = ClauseModel::builder()
            .order_by("ts")
            .pattern("A")
            .build()
            .unwrap_err();
        assert_eq!(err, RewriteError::MissingClause { clause: "FROM" });

        let err = ClauseModel::builder()
            .source("t")
            .pattern("A")
            .build()
            .unwrap_err();
        assert_eq!(err, RewriteError::MissingClause { clause: "ORDER BY" });

        let err = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .build()
            .unwrap_err();
        assert_eq!(err, RewriteError::MissingClause { clause: "PATTERN" });
    }

    #[test]
    fn test_builder_renders_clause_when_missing() {
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .partition_by("user_id")
            .pattern("A B")
            .define("B", "B.x > A.x")
            .build()
            .unwrap();
        assert_eq!(
            model.original_clause(),
            "PARTITION BY user_id\n\tORDER BY ts\n\tPATTERN (A B)\n\tDEFINE\n\t\tB AS B.x > A.x"
        );
    }

    #[test]
    fn test_builder_keeps_original_clause_verbatim() {
        let clause = "ORDER BY ts\n  MEASURES A.ts AS start_ts\n  PATTERN (A B)\n  DEFINE B AS B.x > A.x";
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .pattern("A B")
            .define("B", "B.x > A.x")
            .original_clause(clause)
            .build()
            .unwrap();
        assert_eq!(model.original_clause(), clause);
        assert!(model.condition(&Symbol::new("A")).is_none());
        assert!(model.condition(&Symbol::new("b")).is_some());
    }
}
