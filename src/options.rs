// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Rewrite configuration: strategy, target dialect and bucket granularity.

use std::fmt;
use std::num::NonZeroU32;

/// Prefilter construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteMode {
    /// Range join: one span per candidate partial match.
    Basic,
    /// Time-bucketed join: candidate partial matches are collapsed to bucket
    /// indices of the window width.
    Bucket,
}

impl RewriteMode {
    /// Parses a mode name (`basic`, `bucket`), case-insensitive.
    ///
    /// Returns `None` for unrecognized names.
    #[must_use]
    pub fn parse_mode_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "range" => Some(Self::Basic),
            "bucket" | "buckets" => Some(Self::Bucket),
            _ => None,
        }
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Bucket => write!(f, "bucket"),
        }
    }
}

/// SQL dialect of the generated helper queries.
///
/// The pattern-matching clause itself is echoed verbatim; only the bucket
/// arithmetic and the bucket-range expansion differ between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Trino / Presto: `to_unixtime`, `CROSS JOIN UNNEST(sequence(..))`.
    #[default]
    Trino,
    /// DuckDB: `epoch`, `unnest(generate_series(..))`.
    DuckDb,
}

impl Dialect {
    /// Parses a dialect name (`trino`, `presto`, `duckdb`), case-insensitive.
    ///
    /// Returns `None` for unrecognized names.
    #[must_use]
    pub fn parse_dialect_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trino" | "presto" => Some(Self::Trino),
            "duckdb" => Some(Self::DuckDb),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trino => write!(f, "trino"),
            Self::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Options shared by both strategies.
///
/// ```
/// use std::num::NonZeroU32;
/// use prefilter::options::{Dialect, RewriteOptions};
///
/// let opts = RewriteOptions::default()
///     .with_dialect(Dialect::DuckDb)
///     .with_bucket_divisions(NonZeroU32::new(2).unwrap());
/// assert_eq!(opts.bucket_divisions().get(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    dialect: Dialect,
    bucket_divisions: NonZeroU32,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Trino,
            bucket_divisions: NonZeroU32::MIN,
        }
    }
}

impl RewriteOptions {
    /// Sets the target dialect.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Splits each window-wide bucket into `divisions` narrower buckets.
    ///
    /// With `d` divisions a bucket is `bound / d` wide and the last member of
    /// a match may lie up to `d` buckets after the first. More divisions give a
    /// tighter filter at the cost of a larger bucket-pair join.
    #[must_use]
    pub const fn with_bucket_divisions(mut self, divisions: NonZeroU32) -> Self {
        self.bucket_divisions = divisions;
        self
    }

    /// Target dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of buckets per window width.
    #[must_use]
    pub const fn bucket_divisions(&self) -> NonZeroU32 {
        self.bucket_divisions
    }
}
