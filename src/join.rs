// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! The self-join both strategies are built on.
//!
//! One join alias per single-row subsequence member, named after the
//! symbol. The join carries every predicate that can be evaluated on those
//! aliases alone:
//!
//! - partition equality to the first alias,
//! - `SelfOnly` and `CrossRef` conjuncts of every member,
//! - the window bound, propagated to the outermost aliases that lie between
//!   the window's two symbols.
//!
//! Navigational conjuncts and conjuncts reading a symbol without an alias
//! (a zero-or-more separator) are left out. Leaving a conjunct out admits
//! more candidate rows and never fewer.

use tracing::trace;

use crate::classify::{ClassifiedConditions, ConditionKind, WindowBound, WindowCondition};
use crate::error::{RewriteError, SpanSide};
use crate::model::expr::{BinaryOp, Expr};
use crate::model::{ClauseModel, Quantifier, Subsequence, Symbol};
use crate::options::RewriteOptions;

/// Everything a prefilter strategy reads.
#[derive(Debug, Clone, Copy)]
pub struct PrefilterInput<'a> {
    /// The query being rewritten.
    pub model: &'a ClauseModel,
    /// Its classified `DEFINE` conjuncts.
    pub conditions: &'a ClassifiedConditions,
    /// Caller-selected symbols, already validated.
    pub subsequence: &'a Subsequence,
    /// Output options.
    pub options: &'a RewriteOptions,
}

/// Aliases and rendered conditions of the subsequence self-join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    aliases: Vec<Symbol>,
    conditions: Vec<String>,
    covers_first: bool,
    covers_last: bool,
}

impl JoinPlan {
    /// Plans the join for a validated subsequence.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::UnsupportedPatternShape`] if the subsequence
    /// has no single-row member to join on.
    pub fn new(input: &PrefilterInput<'_>) -> Result<Self, RewriteError> {
        let model = input.model;
        let pattern = model.pattern();

        let aliases: Vec<Symbol> = input
            .subsequence
            .symbols()
            .iter()
            .filter(|s| pattern.quantifier(s) == Some(Quantifier::Single))
            .cloned()
            .collect();
        let Some(head) = aliases.first() else {
            return Err(RewriteError::unsupported(
                "subsequence has no single-row symbol to join on",
            ));
        };

        let mut conditions = Vec::new();
        for alias in &aliases[1..] {
            for column in model.partition_by() {
                conditions.push(format!("{head}.{column} = {alias}.{column}"));
            }
        }

        for alias in &aliases {
            for pred in input.conditions.predicates(alias) {
                let usable = match &pred.kind {
                    ConditionKind::SelfOnly => true,
                    ConditionKind::CrossRef(refs) => {
                        !pred.window && refs.iter().all(|r| aliases.contains(r))
                    }
                    ConditionKind::Navigational => false,
                };
                if usable {
                    conditions.push(pred.predicate.expr.to_string());
                } else {
                    trace!(symbol = %alias, predicate = %pred.predicate.expr, "left out of join");
                }
            }
        }

        if let Some(window) = input.conditions.window() {
            if let Some(bound) = propagated_window(model, &aliases, window) {
                conditions.push(bound);
            }
        }

        let covers_first = pattern.first().is_some_and(|s| aliases.contains(s));
        let covers_last = pattern.last().is_some_and(|s| aliases.contains(s));

        Ok(Self {
            aliases,
            conditions,
            covers_first,
            covers_last,
        })
    }

    /// Join aliases in subsequence order.
    #[must_use]
    pub fn aliases(&self) -> &[Symbol] {
        &self.aliases
    }

    /// Rendered join conditions.
    #[must_use]
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// True if the pattern's first symbol is joined.
    #[must_use]
    pub const fn covers_first(&self) -> bool {
        self.covers_first
    }

    /// True if the pattern's last symbol is joined.
    #[must_use]
    pub const fn covers_last(&self) -> bool {
        self.covers_last
    }

    /// First and last alias. Equal when only one symbol is joined.
    #[must_use]
    pub fn endpoints(&self) -> (&Symbol, &Symbol) {
        // `new` guarantees at least one alias
        let first = &self.aliases[0];
        let last = &self.aliases[self.aliases.len() - 1];
        (first, last)
    }

    /// `rel AS R, rel AS B, ...`
    #[must_use]
    pub fn from_list(&self, relation: &str) -> String {
        self.aliases
            .iter()
            .map(|a| format!("{relation} AS {a}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `hi.ord - lo.ord <= bound` for the outermost aliases inside the window.
///
/// Rows of the pattern are ordered, so any two members between the window's
/// symbols are at most the window apart. Returns `None` if fewer than two
/// aliases lie inside.
fn propagated_window(
    model: &ClauseModel,
    aliases: &[Symbol],
    window: &WindowCondition,
) -> Option<String> {
    let pattern = model.pattern();
    let lo_pos = pattern.position(&window.earlier)?;
    let hi_pos = pattern.position(&window.later)?;
    let inside: Vec<&Symbol> = aliases
        .iter()
        .filter(|a| pattern.position(a).is_some_and(|p| (lo_pos..=hi_pos).contains(&p)))
        .collect();
    let (lo, hi) = (inside.first()?, inside.last()?);
    if lo == hi {
        return None;
    }
    let diff = Expr::binary(
        BinaryOp::Sub,
        Expr::column(hi, model.order_by()),
        Expr::column(lo, model.order_by()),
    );
    Some(format!("{diff} <= {}", window.bound))
}

/// Returns the window if it bounds the pattern's first and last symbols.
pub(crate) fn spanning_window<'a>(
    model: &ClauseModel,
    conditions: &'a ClassifiedConditions,
) -> Option<&'a WindowCondition> {
    let pattern = model.pattern();
    conditions.window().filter(|w| {
        pattern.first() == Some(&w.earlier) && pattern.last() == Some(&w.later)
    })
}

/// Start and end of the span a match may cover, given the join endpoints.
///
/// A covered pattern end is bounded by its own alias. An uncovered end is
/// bounded by reaching `reach` from the opposite alias, which requires a
/// window over the whole pattern. `shift(expr, side)` renders the shifted
/// bound.
pub(crate) fn span_bounds(
    plan: &JoinPlan,
    reach: Option<&WindowBound>,
    endpoint: impl Fn(&Symbol) -> String,
    shift: impl Fn(&str, SpanSide, &WindowBound) -> String,
) -> Result<(String, String), RewriteError> {
    let (first, last) = plan.endpoints();
    let start = if plan.covers_first() {
        endpoint(first)
    } else {
        let bound = reach.ok_or(RewriteError::UnboundedMatchSpan {
            side: SpanSide::Start,
        })?;
        shift(&endpoint(last), SpanSide::Start, bound)
    };
    let end = if plan.covers_last() {
        endpoint(last)
    } else {
        let bound = reach.ok_or(RewriteError::UnboundedMatchSpan {
            side: SpanSide::End,
        })?;
        shift(&endpoint(first), SpanSide::End, bound)
    };
    Ok((start, end))
}
