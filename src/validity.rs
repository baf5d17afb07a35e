// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Structural checks on the clause model and the caller's subsequence.
//!
//! All checks run before any SQL is built. [`check_model`] enforces the
//! pattern invariants once per model; [`check_subsequence`] and
//! [`check_self_contained`] validate one rewrite request.
//!
//! Self-containment is a subset check over a [`DependencyGraph`] whose edges
//! run from a symbol to every symbol its cross-referencing predicates read.
//! A subsequence is self-contained when no edge leaves it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::classify::ClassifiedConditions;
use crate::error::RewriteError;
use crate::model::{ClauseModel, Quantifier, Subsequence, Symbol};
use crate::options::RewriteMode;

/// Checks the pattern and `DEFINE` invariants of `model`.
///
/// # Errors
///
/// - [`RewriteError::UnsupportedPatternShape`] for an empty pattern, a
///   non-`*` symbol occurring twice, a `*` symbol at either end, a duplicate
///   `DEFINE`, or a predicate reading a symbol later in the pattern than its
///   owner.
/// - [`RewriteError::UnknownSymbol`] for a `DEFINE` of, or a reference to, a
///   symbol the pattern does not contain.
pub fn check_model(model: &ClauseModel) -> Result<(), RewriteError> {
    let pattern = model.pattern();
    let occurrences = pattern.occurrences();
    let (Some(first), Some(last)) = (occurrences.first(), occurrences.last()) else {
        return Err(RewriteError::unsupported("empty pattern"));
    };

    // Only `*` separators may occur more than once
    let mut seen: HashMap<&Symbol, Quantifier> = HashMap::new();
    for occ in occurrences {
        if let Some(prev) = seen.insert(&occ.symbol, occ.quantifier) {
            if prev != Quantifier::ZeroOrMore || occ.quantifier != Quantifier::ZeroOrMore {
                return Err(RewriteError::unsupported(format!(
                    "symbol {} appears more than once in the pattern",
                    occ.symbol
                )));
            }
        }
    }

    for (end, occ) in [("first", first), ("last", last)] {
        if occ.quantifier != Quantifier::Single {
            return Err(RewriteError::unsupported(format!(
                "{end} pattern symbol {} must match exactly one row",
                occ.symbol
            )));
        }
    }

    let mut defined = HashSet::new();
    for cond in model.conditions() {
        let owner = &cond.symbol;
        let Some(owner_pos) = pattern.last_position(owner) else {
            return Err(RewriteError::UnknownSymbol {
                symbol: owner.clone(),
            });
        };
        if !defined.insert(owner) {
            return Err(RewriteError::unsupported(format!(
                "symbol {owner} is defined more than once"
            )));
        }
        for referenced in cond.condition.qualifiers() {
            let Some(ref_pos) = pattern.position(&referenced) else {
                return Err(RewriteError::UnknownSymbol { symbol: referenced });
            };
            if ref_pos > owner_pos {
                return Err(RewriteError::unsupported(format!(
                    "DEFINE {owner} references {referenced}, which comes later in the pattern"
                )));
            }
        }
    }
    Ok(())
}

/// Checks that `subsequence` is a usable selection of pattern symbols for
/// `mode`.
///
/// # Errors
///
/// - [`RewriteError::EmptySubsequence`] if nothing is selected.
/// - [`RewriteError::UnknownSymbol`] for a symbol outside the pattern.
/// - [`RewriteError::SubsequenceOrderMismatch`] if the symbols are not in
///   strictly increasing pattern order.
/// - [`RewriteError::UnsupportedPatternShape`] for a `*` symbol in basic
///   mode, or a `*` symbol with its own `DEFINE` in bucket mode.
pub fn check_subsequence(
    model: &ClauseModel,
    subsequence: &Subsequence,
    mode: RewriteMode,
) -> Result<(), RewriteError> {
    if subsequence.is_empty() {
        return Err(RewriteError::EmptySubsequence);
    }

    let pattern = model.pattern();
    let mut previous: Option<usize> = None;
    for symbol in subsequence.symbols() {
        if !pattern.contains(symbol) {
            return Err(RewriteError::UnknownSymbol {
                symbol: symbol.clone(),
            });
        }
        let Some(pos) = pattern.position_after(symbol, previous) else {
            return Err(RewriteError::SubsequenceOrderMismatch {
                symbol: symbol.clone(),
            });
        };
        previous = Some(pos);

        if pattern.quantifier(symbol) == Some(Quantifier::ZeroOrMore) {
            match mode {
                RewriteMode::Basic => {
                    return Err(RewriteError::unsupported(format!(
                        "basic mode cannot include the zero-or-more symbol {symbol}"
                    )))
                }
                RewriteMode::Bucket if model.condition(symbol).is_some() => {
                    return Err(RewriteError::unsupported(format!(
                        "zero-or-more symbol {symbol} has its own DEFINE"
                    )))
                }
                RewriteMode::Bucket => {}
            }
        }
    }
    Ok(())
}

/// Checks that every cross-referencing predicate of every subsequence
/// member reads only subsequence members.
///
/// # Errors
///
/// Returns [`RewriteError::NonSelfContainedSubsequence`] naming the first
/// offending member (in subsequence order) and its first missing reference
/// (in symbol order).
pub fn check_self_contained(
    conditions: &ClassifiedConditions,
    subsequence: &Subsequence,
) -> Result<(), RewriteError> {
    match DependencyGraph::from_conditions(conditions).first_escape(subsequence) {
        Some((symbol, missing)) => {
            Err(RewriteError::NonSelfContainedSubsequence { symbol, missing })
        }
        None => Ok(()),
    }
}

/// Directed graph from each symbol to the symbols its cross-referencing
/// predicates read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<Symbol, BTreeSet<Symbol>>,
}

impl DependencyGraph {
    /// Builds the graph from classified conditions.
    #[must_use]
    pub fn from_conditions(conditions: &ClassifiedConditions) -> Self {
        let mut edges: BTreeMap<Symbol, BTreeSet<Symbol>> = BTreeMap::new();
        for (symbol, predicates) in conditions.iter() {
            for pred in predicates {
                if let Some(refs) = pred.kind.references() {
                    edges
                        .entry(symbol.clone())
                        .or_default()
                        .extend(refs.iter().cloned());
                }
            }
        }
        Self { edges }
    }

    /// Symbols `symbol` depends on.
    #[must_use]
    pub fn dependencies(&self, symbol: &Symbol) -> Option<&BTreeSet<Symbol>> {
        self.edges.get(symbol)
    }

    /// First `(member, reference)` edge that leaves `subsequence`.
    #[must_use]
    pub fn first_escape(&self, subsequence: &Subsequence) -> Option<(Symbol, Symbol)> {
        subsequence.symbols().iter().find_map(|symbol| {
            self.dependencies(symbol)?
                .iter()
                .find(|r| !subsequence.contains(r))
                .map(|missing| (symbol.clone(), missing.clone()))
        })
    }
}
