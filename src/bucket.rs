// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Bucket mode: time-bucketed prefilter.
//!
//! Every source row gets a bucket index `bk = floor(ord * d / w)`, where `w`
//! is the bound of the window over the whole pattern and `d` the configured
//! number of divisions. Two rows of one match are at most `w` apart, so
//! their buckets differ by at most `k = d`.
//!
//! The subsequence self-join then runs on bucket indices: one branch keeps
//! candidates whose members all share the first member's bucket, a second
//! keeps candidates whose last member is `1..=k` buckets later. Each
//! candidate yields a bucket span, widened by `k` on any side where the
//! pattern's end symbol is not joined:
//!
//! | pattern first joined | pattern last joined | `bk_s`    | `bk_e`    |
//! |----------------------|---------------------|-----------|-----------|
//! | yes                  | yes                 | `S0.bk`   | `Sn.bk`   |
//! | no                   | yes                 | `Sn.bk-k` | `Sn.bk`   |
//! | yes                  | no                  | `S0.bk`   | `S0.bk+k` |
//! | no                   | no                  | `Sn.bk-k` | `S0.bk+k` |
//!
//! Every bucket inside some span is kept, and the prefilter keeps the
//! source rows that fall into a kept bucket.

use tracing::debug;

use crate::assemble::{Cte, FilterConstruct, PREFILTER_CTE};
use crate::classify::WindowBound;
use crate::common::duration::format_seconds;
use crate::common::sql::where_clause;
use crate::error::{RewriteError, SpanSide};
use crate::join::{span_bounds, spanning_window, JoinPlan, PrefilterInput};
use crate::options::{Dialect, RewriteMode};

const BUCKETIZED_CTE: &str = "input_bucketized";

/// Width of one window, in the order column's units.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BucketWidth {
    /// Plain numeric order column.
    Numeric(String),
    /// Timestamp order column, width in seconds.
    Seconds(String),
}

impl BucketWidth {
    fn from_bound(bound: &WindowBound) -> Result<Self, RewriteError> {
        let unsupported = || RewriteError::UnsupportedWindowBound {
            bound: bound.to_string(),
        };
        match bound {
            WindowBound::Numeric(n) => {
                let value: f64 = n.parse().map_err(|_| unsupported())?;
                if value.is_finite() && value > 0.0 {
                    Ok(Self::Numeric(n.clone()))
                } else {
                    Err(unsupported())
                }
            }
            WindowBound::Interval(iv) => match iv.to_micros() {
                Some(micros) if micros > 0 => Ok(Self::Seconds(format_seconds(micros))),
                _ => Err(unsupported()),
            },
        }
    }

    /// SQL expression for the bucket index of `column`.
    fn index_of(&self, column: &str, divisions: u32, dialect: Dialect) -> String {
        let (value, width) = match (self, dialect) {
            (Self::Numeric(w), Dialect::Trino) => (format!("CAST({column} AS double)"), w),
            (Self::Numeric(w), Dialect::DuckDb) => (column.to_string(), w),
            (Self::Seconds(w), Dialect::Trino) => (format!("to_unixtime({column})"), w),
            (Self::Seconds(w), Dialect::DuckDb) => (format!("epoch({column})"), w),
        };
        let scaled = if divisions > 1 {
            format!("{value} * {divisions}")
        } else {
            value
        };
        let bigint = match dialect {
            Dialect::Trino => "bigint",
            Dialect::DuckDb => "BIGINT",
        };
        format!("CAST(floor({scaled} / {width}) AS {bigint})")
    }
}

/// Builds the `input_bucketized`, `ranges`, `buckets` and `prefilter` CTEs.
///
/// # Errors
///
/// - [`RewriteError::NoWindowCondition`] if the query has no window.
/// - [`RewriteError::WindowDoesNotSpanPattern`] if the window does not
///   bound the pattern's first and last symbols.
/// - [`RewriteError::UnsupportedWindowBound`] for a calendar or
///   non-positive bound.
pub fn build(input: &PrefilterInput<'_>) -> Result<FilterConstruct, RewriteError> {
    let model = input.model;
    let window = input
        .conditions
        .window()
        .ok_or(RewriteError::NoWindowCondition)?;
    if spanning_window(model, input.conditions).is_none() {
        return Err(RewriteError::WindowDoesNotSpanPattern {
            earlier: window.earlier.clone(),
            later: window.later.clone(),
        });
    }
    let width = BucketWidth::from_bound(&window.bound)?;
    let plan = JoinPlan::new(input)?;

    let dialect = input.options.dialect();
    let k = input.options.bucket_divisions().get();
    let ord = model.order_by();

    let bucketized = format!(
        "\tSELECT *, {} AS bk\n\tFROM {}",
        width.index_of(ord, k, dialect),
        model.source()
    );

    let (bk_s, bk_e) = span_bounds(
        &plan,
        Some(&window.bound),
        |alias| format!("{alias}.bk"),
        |expr, side, _| match side {
            SpanSide::Start => format!("{expr} - {k}"),
            SpanSide::End => format!("{expr} + {k}"),
        },
    )?;

    let (head, last) = plan.endpoints();
    let mut select: Vec<String> = model
        .partition_by()
        .iter()
        .map(|p| format!("{head}.{p} AS {p}"))
        .collect();
    select.push(format!("{bk_s} AS bk_s"));
    select.push(format!("{bk_e} AS bk_e"));
    let select = select.join(", ");
    let from = plan.from_list(BUCKETIZED_CTE);

    let aliases = plan.aliases();
    let mut same_bucket: Vec<String> = aliases[1..]
        .iter()
        .map(|a| format!("{head}.bk = {a}.bk"))
        .collect();
    same_bucket.extend(plan.conditions().iter().cloned());
    let mut ranges = branch(&select, &from, &same_bucket);

    if aliases.len() > 1 {
        let mut neighbour = vec![if k == 1 {
            format!("{head}.bk + 1 = {last}.bk")
        } else {
            format!("{last}.bk - {head}.bk BETWEEN 1 AND {k}")
        }];
        if aliases.len() > 2 {
            neighbour.extend(
                aliases
                    .windows(2)
                    .map(|pair| format!("{}.bk <= {}.bk", pair[0], pair[1])),
            );
        }
        neighbour.extend(plan.conditions().iter().cloned());
        ranges.push_str("\n\tUNION\n");
        ranges.push_str(&branch(&select, &from, &neighbour));
    }

    let buckets = expand_buckets(model.partition_by(), dialect);

    let mut membership = vec![format!(
        "b.bk = {}",
        width.index_of(&format!("src.{ord}"), k, dialect)
    )];
    membership.extend(
        model
            .partition_by()
            .iter()
            .map(|p| format!("b.{p} = src.{p}")),
    );
    let prefilter = format!(
        "\tSELECT src.*\n\tFROM {} AS src\n\tWHERE EXISTS (\n\t\tSELECT 1\n\t\tFROM buckets AS b\n{}\n\t)",
        model.source(),
        where_clause(&membership, "\t\t").unwrap_or_default()
    );

    debug!(
        aliases = aliases.len(),
        divisions = k,
        %dialect,
        width = ?width,
        "built bucket prefilter"
    );

    Ok(FilterConstruct {
        mode: RewriteMode::Bucket,
        ctes: vec![
            Cte::new(BUCKETIZED_CTE, bucketized),
            Cte::new("ranges", ranges),
            Cte::new("buckets", buckets),
            Cte::new(PREFILTER_CTE, prefilter),
        ],
    })
}

fn branch(select: &str, from: &str, conditions: &[String]) -> String {
    let mut out = format!("\tSELECT {select}\n\tFROM {from}");
    if let Some(filter) = where_clause(conditions, "\t") {
        out.push('\n');
        out.push_str(&filter);
    }
    out
}

/// Distinct bucket indices covered by the `[bk_s, bk_e]` spans of `ranges`.
fn expand_buckets(partition_by: &[String], dialect: Dialect) -> String {
    match dialect {
        Dialect::Trino => {
            let mut columns: Vec<String> =
                partition_by.iter().map(|p| format!("ranges.{p}")).collect();
            columns.push("t.bk".to_string());
            format!(
                "\tSELECT DISTINCT {}\n\tFROM ranges\n\tCROSS JOIN UNNEST(sequence(ranges.bk_s, ranges.bk_e)) AS t(bk)",
                columns.join(", ")
            )
        }
        Dialect::DuckDb => {
            let mut outer: Vec<String> = partition_by.iter().map(|p| format!("b.{p}")).collect();
            outer.push("b.bk".to_string());
            let mut inner: Vec<String> = partition_by.to_vec();
            inner.push("unnest(generate_series(bk_s, bk_e)) AS bk".to_string());
            format!(
                "\tSELECT DISTINCT {}\n\tFROM (\n\t\tSELECT {}\n\t\tFROM ranges\n\t) AS b",
                outer.join(", "),
                inner.join(", ")
            )
        }
    }
}
