// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Query assembly.
//!
//! The rewritten query is the strategy's CTEs followed by the original
//! `MATCH_RECOGNIZE` clause, unchanged, scanning `prefilter` instead of the
//! source relation:
//!
//! ```text
//! WITH ranges AS (
//!     ...
//! ),
//! prefilter AS (
//!     ...
//! )
//! SELECT * FROM prefilter MATCH_RECOGNIZE (
//!     <original clause>
//! )
//! ```

use std::fmt;

use crate::options::RewriteMode;

/// Name of the CTE every strategy ends with.
pub const PREFILTER_CTE: &str = "prefilter";

/// One named common table expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cte {
    /// CTE name.
    pub name: &'static str,
    /// Query body, one tab-indented line per clause.
    pub body: String,
}

impl Cte {
    /// Creates a CTE.
    #[must_use]
    pub fn new(name: &'static str, body: impl Into<String>) -> Self {
        Self {
            name,
            body: body.into(),
        }
    }
}

/// The helper queries a strategy produces, in dependency order. The last
/// one is always [`PREFILTER_CTE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConstruct {
    /// Strategy that produced the CTEs.
    pub mode: RewriteMode,
    /// CTEs in the order they must be declared.
    pub ctes: Vec<Cte>,
}

/// A rewritten query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenQuery {
    mode: RewriteMode,
    ctes: Vec<Cte>,
    clause: String,
}

impl RewrittenQuery {
    /// The strategy used.
    #[must_use]
    pub const fn mode(&self) -> RewriteMode {
        self.mode
    }

    /// The helper CTEs, in declaration order.
    #[must_use]
    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    /// The echoed `MATCH_RECOGNIZE` body.
    #[must_use]
    pub fn clause(&self) -> &str {
        &self.clause
    }

    /// The full rewritten query.
    #[must_use]
    pub fn sql(&self) -> String {
        format!(
            "{}\nSELECT * FROM {PREFILTER_CTE} MATCH_RECOGNIZE (\n\t{}\n)",
            self.with_clause(),
            self.clause
        )
    }

    /// Only the prefilter, as `WITH ... SELECT * FROM prefilter`.
    ///
    /// Useful for measuring how many rows the filter keeps, or on engines
    /// without `MATCH_RECOGNIZE`.
    #[must_use]
    pub fn prefilter_query(&self) -> String {
        format!("{}\nSELECT * FROM {PREFILTER_CTE}", self.with_clause())
    }

    fn with_clause(&self) -> String {
        let ctes: Vec<String> = self
            .ctes
            .iter()
            .map(|c| format!("{} AS (\n{}\n)", c.name, c.body))
            .collect();
        format!("WITH {}", ctes.join(",\n"))
    }
}

impl fmt::Display for RewrittenQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}

/// Combines a strategy's CTEs with the original clause.
#[must_use]
pub fn assemble(construct: FilterConstruct, original_clause: &str) -> RewrittenQuery {
    RewrittenQuery {
        mode: construct.mode,
        ctes: construct.ctes,
        clause: original_clause.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn construct() -> FilterConstruct {
        FilterConstruct {
            mode: RewriteMode::Basic,
            ctes: vec![
                Cte::new("ranges", "\tSELECT 1 AS t_s, 2 AS t_e"),
                Cte::new(PREFILTER_CTE, "\tSELECT * FROM t"),
            ],
        }
    }

    #[test]
    fn test_sql_layout() {
        let q = assemble(construct(), "  ORDER BY ts PATTERN (A) DEFINE A AS x > 1 ");
        assert_eq!(
            q.sql(),
            "WITH ranges AS (\n\tSELECT 1 AS t_s, 2 AS t_e\n),\n\
             prefilter AS (\n\tSELECT * FROM t\n)\n\
             SELECT * FROM prefilter MATCH_RECOGNIZE (\n\
             \tORDER BY ts PATTERN (A) DEFINE A AS x > 1\n)"
        );
        assert_eq!(q.to_string(), q.sql());
        assert_eq!(q.mode(), RewriteMode::Basic);
    }

    #[test]
    fn test_prefilter_query() {
        let q = assemble(construct(), "PATTERN (A)");
        assert!(q.prefilter_query().ends_with(")\nSELECT * FROM prefilter"));
        assert!(!q.prefilter_query().contains("MATCH_RECOGNIZE"));
    }

    #[test]
    fn test_clause_echoed_verbatim() {
        let clause = "MEASURES A.ts AS s\n\tONE ROW PER MATCH\n\tAFTER MATCH SKIP PAST LAST ROW\n\tPATTERN (A B)";
        let q = assemble(construct(), clause);
        assert_eq!(q.clause(), clause);
        assert!(q.sql().contains(clause));
    }
}
