// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Error taxonomy for prefilter rewriting.
//!
//! Every error is terminal for the invocation that produced it: the rewrite
//! pipeline checks all preconditions before constructing any SQL, so a failed
//! call never leaves partial query text behind. Callers are expected to
//! surface the error as-is; there is no automatic fallback from one
//! [`RewriteMode`](crate::options::RewriteMode) to the other.

use std::fmt;

use thiserror::Error;

use crate::model::Symbol;

/// Which end of a match span could not be bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanSide {
    /// The earliest row a match may start at.
    Start,
    /// The latest row a match may end at.
    End,
}

impl fmt::Display for SpanSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Error returned when a query cannot be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RewriteError {
    /// A cross-referencing predicate of `symbol` needs `missing`, which the
    /// subsequence does not contain.
    #[error(
        "subsequence is not self-contained: {symbol} references {missing}, \
         which is not part of the subsequence"
    )]
    NonSelfContainedSubsequence {
        /// First subsequence symbol with an unsatisfied reference.
        symbol: Symbol,
        /// First referenced symbol outside the subsequence.
        missing: Symbol,
    },

    /// More than one `LATER.col - EARLIER.col <= bound` predicate was found.
    #[error("more than one window condition: found one in DEFINE {first} and another in DEFINE {second}")]
    MultipleWindowConditions {
        /// Symbol whose DEFINE holds the first window condition.
        first: Symbol,
        /// Symbol whose DEFINE holds the second window condition.
        second: Symbol,
    },

    /// Bucket mode was requested but no window condition exists.
    #[error("bucket mode requires a window condition of the form `LAST.col - FIRST.col <= bound`")]
    NoWindowCondition,

    /// The window condition does not bound the first and last pattern symbols.
    #[error("window condition {later} - {earlier} does not span the whole pattern")]
    WindowDoesNotSpanPattern {
        /// Earlier symbol of the window condition.
        earlier: Symbol,
        /// Later symbol of the window condition.
        later: Symbol,
    },

    /// The window bound has no fixed width (e.g. a month interval).
    #[error("window bound {bound} has no fixed width")]
    UnsupportedWindowBound {
        /// The bound as written.
        bound: String,
    },

    /// The pattern or subsequence uses a construct the rewriter cannot handle.
    #[error("unsupported pattern shape: {reason}")]
    UnsupportedPatternShape {
        /// Human-readable description of the offending construct.
        reason: String,
    },

    /// The subsequence contains no symbols.
    #[error("subsequence is empty")]
    EmptySubsequence,

    /// The subsequence does not follow pattern order (or repeats a symbol).
    #[error("subsequence is not in pattern order at {symbol}")]
    SubsequenceOrderMismatch {
        /// First symbol that breaks the order.
        symbol: Symbol,
    },

    /// A symbol is referenced that the pattern does not declare.
    #[error("unknown pattern symbol {symbol}")]
    UnknownSymbol {
        /// The undeclared symbol.
        symbol: Symbol,
    },

    /// The subsequence leaves one end of the match span unbounded.
    #[error(
        "match span has no {side} bound: the subsequence does not include the pattern's \
         {side} symbol and no window condition spans the pattern"
    )]
    UnboundedMatchSpan {
        /// The unbounded end.
        side: SpanSide,
    },

    /// A required clause was not supplied to the model builder.
    #[error("missing {clause} clause")]
    MissingClause {
        /// Name of the clause (`PATTERN`, `ORDER BY`, ...).
        clause: &'static str,
    },

    /// Pattern or DEFINE text could not be parsed.
    #[error("parse error at position {position}: {message}")]
    Parse {
        /// Human-readable error message.
        message: String,
        /// Byte position in the input where the error occurred.
        position: usize,
    },
}

impl RewriteError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedPatternShape {
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }
}
