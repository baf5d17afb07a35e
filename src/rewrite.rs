// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! The rewrite pipeline.
//!
//! ```text
//! check_model → classify → check_subsequence → check_self_contained
//!             → range::build | bucket::build → assemble
//! ```
//!
//! Every check runs before any SQL is produced. The first failure is
//! returned as-is; there is no fallback from one mode to the other.

use tracing::debug;

use crate::assemble::{assemble, FilterConstruct, RewrittenQuery};
use crate::classify::classify;
use crate::error::RewriteError;
use crate::join::PrefilterInput;
use crate::model::{ClauseModel, Subsequence};
use crate::options::{RewriteMode, RewriteOptions};
use crate::validity::{check_model, check_self_contained, check_subsequence};
use crate::{bucket, range};

/// Signature shared by the prefilter strategies.
pub type Strategy = fn(&PrefilterInput<'_>) -> Result<FilterConstruct, RewriteError>;

/// Returns the builder for `mode`.
#[must_use]
pub fn strategy(mode: RewriteMode) -> Strategy {
    match mode {
        RewriteMode::Basic => range::build,
        RewriteMode::Bucket => bucket::build,
    }
}

/// Validates the request and builds the mode's helper CTEs.
///
/// # Errors
///
/// Returns the first failed check of the pipeline; see [`RewriteError`].
pub fn build_prefilter(
    model: &ClauseModel,
    mode: RewriteMode,
    subsequence: &Subsequence,
    options: &RewriteOptions,
) -> Result<FilterConstruct, RewriteError> {
    check_model(model)?;
    debug!(pattern = %model.pattern(), source = model.source(), "model checked");

    let conditions = classify(model)?;
    match conditions.window() {
        Some(w) => debug!(earlier = %w.earlier, later = %w.later, bound = %w.bound, "window detected"),
        None => debug!("no window condition"),
    }

    check_subsequence(model, subsequence, mode)?;
    check_self_contained(&conditions, subsequence)?;
    debug!(%subsequence, %mode, "subsequence accepted");

    let input = PrefilterInput {
        model,
        conditions: &conditions,
        subsequence,
        options,
    };
    strategy(mode)(&input)
}

/// Rewrites `model` so its pattern-matching clause scans a prefilter.
///
/// # Errors
///
/// Returns the first failed check of the pipeline; see [`RewriteError`].
///
/// # Examples
///
/// ```
/// use prefilter::model::{ClauseModel, Subsequence};
/// use prefilter::options::{RewriteMode, RewriteOptions};
/// use prefilter::rewrite::rewrite;
///
/// let model = ClauseModel::builder()
///     .source("crimes")
///     .order_by("time")
///     .pattern("R Z* B")
///     .define("R", "primary_type = 'ROBBERY'")
///     .define("B", "primary_type = 'BATTERY' AND B.time - R.time <= INTERVAL '30' MINUTE")
///     .build()
///     .unwrap();
///
/// let query = rewrite(
///     &model,
///     RewriteMode::Bucket,
///     &Subsequence::parse("R B"),
///     &RewriteOptions::default(),
/// )
/// .unwrap();
/// assert!(query.sql().starts_with("WITH input_bucketized AS ("));
/// assert!(query.sql().contains("SELECT * FROM prefilter MATCH_RECOGNIZE ("));
/// ```
pub fn rewrite(
    model: &ClauseModel,
    mode: RewriteMode,
    subsequence: &Subsequence,
    options: &RewriteOptions,
) -> Result<RewrittenQuery, RewriteError> {
    let construct = build_prefilter(model, mode, subsequence, options)?;
    let query = assemble(construct, model.original_clause());
    debug!(ctes = query.ctes().len(), %mode, "query assembled");
    Ok(query)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::options::Dialect;
    use proptest::prelude::*;

    fn model() -> ClauseModel {
        ClauseModel::builder()
            .source("events")
            .order_by("ts")
            .partition_by("user_id")
            .pattern("A X* B Y* C D")
            .define("A", "kind = 'start'")
            .define("B", "B.v > A.v")
            .define("C", "C.v < B.v AND C.ts - A.ts <= 100")
            .define("D", "D.ts - A.ts <= 100 OR D.kind = 'end'")
            .build()
            .unwrap()
    }

    const SYMBOLS: [&str; 6] = ["A", "X", "B", "Y", "C", "D"];

    proptest! {
        #[test]
        fn rewriting_is_deterministic(
            mask in 1u8..64,
            bucket in any::<bool>(),
            duckdb in any::<bool>(),
            divisions in 1u32..4,
        ) {
            let model = model();
            let s = Subsequence::new(
                (0..6).filter(|i| mask & (1 << i) != 0).map(|i| SYMBOLS[i]),
            );
            let mode = if bucket { RewriteMode::Bucket } else { RewriteMode::Basic };
            let dialect = if duckdb { Dialect::DuckDb } else { Dialect::Trino };
            let options = RewriteOptions::default()
                .with_dialect(dialect)
                .with_bucket_divisions(std::num::NonZeroU32::new(divisions).unwrap());

            let first = rewrite(&model, mode, &s, &options);
            let second = rewrite(&model.clone(), mode, &s.clone(), &options);
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a.sql(), b.sql()),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a, b),
            }
        }

        #[test]
        fn accepted_queries_end_with_original_clause(mask in 1u8..64, bucket in any::<bool>()) {
            let model = model();
            let s = Subsequence::new(
                (0..6).filter(|i| mask & (1 << i) != 0).map(|i| SYMBOLS[i]),
            );
            let mode = if bucket { RewriteMode::Bucket } else { RewriteMode::Basic };
            if let Ok(q) = rewrite(&model, mode, &s, &RewriteOptions::default()) {
                let suffix = format!(
                    "SELECT * FROM prefilter MATCH_RECOGNIZE (\n\t{}\n)",
                    model.original_clause()
                );
                prop_assert!(q.sql().ends_with(&suffix));
            }
        }
    }
}
