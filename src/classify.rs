// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Condition classification.
//!
//! Each `DEFINE` expression is split into its top-level conjuncts (atomic
//! predicates). A conjunct is:
//!
//! - [`ConditionKind::SelfOnly`] when every column it reads belongs to the
//!   owning symbol. Such a conjunct can be checked on a single row.
//! - [`ConditionKind::CrossRef`] when it reads columns of other symbols. It
//!   can only be checked once rows for all of those symbols are joined.
//! - [`ConditionKind::Navigational`] when it calls a row-navigation function
//!   (`PREV`, `LAST`, ...) or a running aggregate. These depend on rows the
//!   prefilter join never materializes, so the builders drop them. Dropping a
//!   conjunct only admits more rows.
//!
//! Among cross-referencing conjuncts, at most one may have the window shape
//! `LATER.ord - EARLIER.ord <= bound`, where `ord` is the `ORDER BY` column
//! and `bound` a numeric or interval literal. It bounds the distance between
//! two symbols and drives span derivation and bucketing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use crate::common::duration::IntervalLiteral;
use crate::error::RewriteError;
use crate::model::expr::{BinaryOp, CompareOp, Expr, Literal};
use crate::model::{ClauseModel, Symbol};

/// Functions whose value depends on rows other than the joined ones.
const NAVIGATION_FUNCTIONS: [&str; 15] = [
    "PREV",
    "NEXT",
    "FIRST",
    "LAST",
    "LAG",
    "LEAD",
    "FIRST_VALUE",
    "LAST_VALUE",
    "CLASSIFIER",
    "MATCH_NUMBER",
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
];

/// Dependency class of an atomic predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionKind {
    /// Reads only the owning symbol's row.
    SelfOnly,
    /// Reads the listed other symbols.
    CrossRef(BTreeSet<Symbol>),
    /// Uses navigation or aggregate functions; never evaluated by the join.
    Navigational,
}

impl ConditionKind {
    /// Symbols other than the owner this predicate reads.
    #[must_use]
    pub fn references(&self) -> Option<&BTreeSet<Symbol>> {
        match self {
            Self::CrossRef(refs) => Some(refs),
            Self::SelfOnly | Self::Navigational => None,
        }
    }
}

/// One top-level conjunct of a symbol's `DEFINE`, with every column
/// qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicPredicate {
    /// Symbol whose `DEFINE` contains this conjunct.
    pub owner: Symbol,
    /// The conjunct; unqualified columns are qualified by `owner`.
    pub expr: Expr,
}

/// An atomic predicate with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPredicate {
    /// The conjunct.
    pub predicate: AtomicPredicate,
    /// Its dependency class.
    pub kind: ConditionKind,
    /// True for the detected window condition.
    pub window: bool,
}

/// Right-hand side of a window condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowBound {
    /// A numeric literal, in the units of the order column.
    Numeric(String),
    /// An interval literal, for timestamp order columns.
    Interval(IntervalLiteral),
}

impl fmt::Display for WindowBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Interval(iv) => write!(f, "{iv}"),
        }
    }
}

/// The detected `later.ord - earlier.ord <= bound` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCondition {
    /// Symbol whose order value is subtracted.
    pub earlier: Symbol,
    /// Symbol whose order value is the minuend.
    pub later: Symbol,
    /// Maximum distance.
    pub bound: WindowBound,
    /// Symbol whose `DEFINE` holds the predicate.
    pub owner: Symbol,
}

/// Classified predicates of every defined symbol plus the optional window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassifiedConditions {
    by_symbol: BTreeMap<Symbol, Vec<ClassifiedPredicate>>,
    window: Option<WindowCondition>,
}

impl ClassifiedConditions {
    /// Predicates of `symbol` in conjunct order; empty if it has no `DEFINE`.
    #[must_use]
    pub fn predicates(&self, symbol: &Symbol) -> &[ClassifiedPredicate] {
        self.by_symbol.get(symbol).map_or(&[][..], Vec::as_slice)
    }

    /// Returns true if `symbol` has a `DEFINE`.
    #[must_use]
    pub fn is_defined(&self, symbol: &Symbol) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    /// Every defined symbol and its predicates, in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &[ClassifiedPredicate])> {
        self.by_symbol.iter().map(|(s, p)| (s, p.as_slice()))
    }

    /// The window condition, if one was detected.
    #[must_use]
    pub const fn window(&self) -> Option<&WindowCondition> {
        self.window.as_ref()
    }
}

/// Classifies every `DEFINE` conjunct of `model` and detects the window.
///
/// # Errors
///
/// Returns [`RewriteError::MultipleWindowConditions`] if more than one
/// conjunct has the window shape.
pub fn classify(model: &ClauseModel) -> Result<ClassifiedConditions, RewriteError> {
    let mut out = ClassifiedConditions::default();
    let mut window: Option<WindowCondition> = None;

    for cond in model.conditions() {
        let owner = &cond.symbol;
        let qualified = cond.condition.qualified_by(owner);
        let mut classified = Vec::new();

        for expr in qualified.into_conjuncts() {
            let kind = kind_of(owner, &expr);
            let mut is_window = false;
            if matches!(kind, ConditionKind::CrossRef(_)) {
                if let Some(found) = match_window(model, owner, &expr) {
                    if let Some(existing) = &window {
                        return Err(RewriteError::MultipleWindowConditions {
                            first: existing.owner.clone(),
                            second: owner.clone(),
                        });
                    }
                    window = Some(found);
                    is_window = true;
                }
            }
            trace!(symbol = %owner, predicate = %expr, ?kind, window = is_window, "classified conjunct");
            classified.push(ClassifiedPredicate {
                predicate: AtomicPredicate {
                    owner: owner.clone(),
                    expr,
                },
                kind,
                window: is_window,
            });
        }
        out.by_symbol
            .entry(owner.clone())
            .or_default()
            .extend(classified);
    }

    out.window = window;
    Ok(out)
}

fn kind_of(owner: &Symbol, expr: &Expr) -> ConditionKind {
    let navigational = expr.called_functions().iter().any(|name| {
        NAVIGATION_FUNCTIONS
            .iter()
            .any(|nav| nav.eq_ignore_ascii_case(name))
    });
    if navigational {
        return ConditionKind::Navigational;
    }
    let mut refs = expr.qualifiers();
    refs.remove(owner);
    if refs.is_empty() {
        ConditionKind::SelfOnly
    } else {
        ConditionKind::CrossRef(refs)
    }
}

/// Matches `L.ord - E.ord <= bound` (or `bound >= L.ord - E.ord`) with E
/// strictly before L in the pattern.
fn match_window(model: &ClauseModel, owner: &Symbol, expr: &Expr) -> Option<WindowCondition> {
    let Expr::Compare { op, lhs, rhs } = expr else {
        return None;
    };
    let (diff, bound) = match op {
        CompareOp::LtEq => (lhs.as_ref(), rhs.as_ref()),
        CompareOp::GtEq => (rhs.as_ref(), lhs.as_ref()),
        _ => return None,
    };

    let bound = match bound {
        Expr::Literal(Literal::Number(n)) => WindowBound::Numeric(n.clone()),
        Expr::Literal(Literal::Interval(iv)) => WindowBound::Interval(iv.clone()),
        _ => return None,
    };

    let Expr::Binary {
        op: BinaryOp::Sub,
        lhs: minuend,
        rhs: subtrahend,
    } = diff
    else {
        return None;
    };
    let later = order_column_symbol(model, minuend)?;
    let earlier = order_column_symbol(model, subtrahend)?;

    let pattern = model.pattern();
    let (e, l) = (pattern.position(earlier)?, pattern.position(later)?);
    if e >= l {
        return None;
    }
    Some(WindowCondition {
        earlier: earlier.clone(),
        later: later.clone(),
        bound,
        owner: owner.clone(),
    })
}

fn order_column_symbol<'a>(model: &ClauseModel, expr: &'a Expr) -> Option<&'a Symbol> {
    match expr {
        Expr::Column(col) if col.is_named(model.order_by()) => col.symbol.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::duration::IntervalUnit;

    fn crimes_model(m_define: &str) -> ClauseModel {
        ClauseModel::builder()
            .source("crimes")
            .order_by("time")
            .pattern("R Z* B Z* M")
            .define("R", "primary_type = 'ROBBERY'")
            .define("B", "primary_type = 'BATTERY' AND abs(B.lat - R.lat) <= 0.01")
            .define("M", m_define)
            .build()
            .unwrap()
    }

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn test_self_only_and_cross_ref() {
        let model = crimes_model("primary_type = 'ARREST'");
        let c = classify(&model).unwrap();

        let r = c.predicates(&sym("R"));
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].kind, ConditionKind::SelfOnly);
        assert_eq!(r[0].predicate.expr.to_string(), "R.primary_type = 'ROBBERY'");

        let b = c.predicates(&sym("B"));
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].kind, ConditionKind::SelfOnly);
        assert_eq!(
            b[1].kind,
            ConditionKind::CrossRef(BTreeSet::from([sym("R")]))
        );
        assert!(c.window().is_none());
    }

    #[test]
    fn test_owner_reference_is_not_cross() {
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .pattern("A")
            .define("A", "A.x > 1 AND x < A.y")
            .build()
            .unwrap();
        let c = classify(&model).unwrap();
        assert!(c
            .predicates(&sym("A"))
            .iter()
            .all(|p| p.kind == ConditionKind::SelfOnly));
    }

    #[test]
    fn test_navigational() {
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .pattern("A B")
            .define("B", "price < PREV(price) AND count(*) < 3 AND B.x > A.x")
            .build()
            .unwrap();
        let c = classify(&model).unwrap();
        let kinds: Vec<_> = c.predicates(&sym("B")).iter().map(|p| p.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ConditionKind::Navigational,
                ConditionKind::Navigational,
                ConditionKind::CrossRef(BTreeSet::from([sym("A")])),
            ]
        );
    }

    #[test]
    fn test_window_detected_with_interval() {
        let model = crimes_model(
            "primary_type = 'ARREST' AND abs(M.lat - R.lat) <= 0.01 AND M.time - R.time <= INTERVAL '30' MINUTE",
        );
        let c = classify(&model).unwrap();
        let w = c.window().unwrap();
        assert_eq!(w.earlier, sym("R"));
        assert_eq!(w.later, sym("M"));
        assert_eq!(w.owner, sym("M"));
        assert_eq!(
            w.bound,
            WindowBound::Interval(IntervalLiteral::new("30", IntervalUnit::Minute))
        );
        let flags: Vec<bool> = c.predicates(&sym("M")).iter().map(|p| p.window).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_window_with_unqualified_owner_column() {
        // `time` belongs to M
        let model = crimes_model("time - R.time <= 30");
        let w = classify(&model).unwrap().window().cloned().unwrap();
        assert_eq!((w.earlier, w.later), (sym("R"), sym("M")));
        assert_eq!(w.bound, WindowBound::Numeric("30".into()));
    }

    #[test]
    fn test_window_reversed_comparison() {
        let model = crimes_model("30 >= M.time - R.time");
        assert!(classify(&model).unwrap().window().is_some());
    }

    #[test]
    fn test_not_a_window() {
        for define in [
            // wrong column
            "M.lat - R.lat <= 30",
            // wrong direction in pattern order
            "R.time - M.time <= 30",
            // non-constant bound
            "M.time - R.time <= R.x",
            // strict comparison
            "M.time - R.time < 30",
            // sum instead of difference
            "M.time + R.time <= 30",
        ] {
            let model = crimes_model(define);
            assert!(
                classify(&model).unwrap().window().is_none(),
                "define {define:?}"
            );
        }
    }

    #[test]
    fn test_multiple_windows_rejected() {
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .pattern("A B C")
            .define("B", "B.ts - A.ts <= 10")
            .define("C", "C.ts - A.ts <= 20")
            .build()
            .unwrap();
        assert_eq!(
            classify(&model).unwrap_err(),
            RewriteError::MultipleWindowConditions {
                first: sym("B"),
                second: sym("C"),
            }
        );
    }

    #[test]
    fn test_two_windows_in_one_define_rejected() {
        let model = ClauseModel::builder()
            .source("t")
            .order_by("ts")
            .pattern("A B C")
            .define("C", "C.ts - A.ts <= 20 AND C.ts - B.ts <= 5")
            .build()
            .unwrap();
        assert!(matches!(
            classify(&model),
            Err(RewriteError::MultipleWindowConditions { .. })
        ));
    }

    #[test]
    fn test_undefined_symbol_has_no_predicates() {
        let model = crimes_model("primary_type = 'ARREST'");
        let c = classify(&model).unwrap();
        assert!(c.predicates(&sym("Z")).is_empty());
        assert!(!c.is_defined(&sym("Z")));
    }
}
