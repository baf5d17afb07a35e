// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Basic mode: range-join prefilter.
//!
//! The subsequence self-join enumerates candidate partial matches. Each
//! candidate yields a span `[t_s, t_e]` of order values that any full match
//! extending it must lie in, and the prefilter keeps every source row whose
//! order value falls inside at least one span.
//!
//! | pattern first joined | pattern last joined | `t_s`      | `t_e`      |
//! |----------------------|---------------------|------------|------------|
//! | yes                  | yes                 | `S0.ord`   | `Sn.ord`   |
//! | no                   | yes                 | `Sn.ord-w` | `Sn.ord`   |
//! | yes                  | no                  | `S0.ord`   | `S0.ord+w` |
//! | no                   | no                  | `Sn.ord-w` | `S0.ord+w` |
//!
//! `w` is the bound of a window over the whole pattern.

use tracing::debug;

use crate::assemble::{Cte, FilterConstruct, PREFILTER_CTE};
use crate::common::sql::where_clause;
use crate::error::{RewriteError, SpanSide};
use crate::join::{span_bounds, spanning_window, JoinPlan, PrefilterInput};
use crate::model::expr::Expr;
use crate::options::RewriteMode;

/// Builds the `ranges` and `prefilter` CTEs.
///
/// # Errors
///
/// Returns [`RewriteError::UnboundedMatchSpan`] if the subsequence misses a
/// pattern end and no window spans the pattern.
pub fn build(input: &PrefilterInput<'_>) -> Result<FilterConstruct, RewriteError> {
    let model = input.model;
    let ord = model.order_by();
    let plan = JoinPlan::new(input)?;

    let window = spanning_window(model, input.conditions).map(|w| &w.bound);
    let (t_s, t_e) = span_bounds(
        &plan,
        window,
        |alias| Expr::column(alias, ord).to_string(),
        |expr, side, bound| match side {
            SpanSide::Start => format!("{expr} - {bound}"),
            SpanSide::End => format!("{expr} + {bound}"),
        },
    )?;

    let mut conditions: Vec<String> = plan
        .aliases()
        .windows(2)
        .map(|pair| {
            format!(
                "{} <= {}",
                Expr::column(&pair[0], ord),
                Expr::column(&pair[1], ord)
            )
        })
        .collect();
    conditions.extend(plan.conditions().iter().cloned());

    let (head, _) = plan.endpoints();
    let mut select: Vec<String> = model
        .partition_by()
        .iter()
        .map(|p| format!("{head}.{p} AS {p}"))
        .collect();
    select.push(format!("{t_s} AS t_s"));
    select.push(format!("{t_e} AS t_e"));

    let mut ranges = format!(
        "\tSELECT {}\n\tFROM {}",
        select.join(", "),
        plan.from_list(model.source())
    );
    if let Some(filter) = where_clause(&conditions, "\t") {
        ranges.push('\n');
        ranges.push_str(&filter);
    }

    let mut membership = vec![format!("src.{ord} BETWEEN r.t_s AND r.t_e")];
    membership.extend(
        model
            .partition_by()
            .iter()
            .map(|p| format!("r.{p} = src.{p}")),
    );
    let prefilter = format!(
        "\tSELECT src.*\n\tFROM {} AS src\n\tWHERE EXISTS (\n\t\tSELECT 1\n\t\tFROM ranges AS r\n{}\n\t)",
        model.source(),
        where_clause(&membership, "\t\t").unwrap_or_default()
    );

    debug!(
        aliases = plan.aliases().len(),
        conditions = conditions.len(),
        %t_s,
        %t_e,
        "built range prefilter"
    );

    Ok(FilterConstruct {
        mode: RewriteMode::Basic,
        ctes: vec![Cte::new("ranges", ranges), Cte::new(PREFILTER_CTE, prefilter)],
    })
}
