//! # `prefilter`: Prefilter Rewriting for `MATCH_RECOGNIZE`
//!
//! Rewrites a row-pattern-matching query so the pattern matcher scans only
//! rows that can take part in a match. The caller picks a subsequence of the
//! pattern's symbols; the rewriter self-joins the source on those symbols,
//! derives the order-value span every full match must fall into, and wraps
//! the unchanged `MATCH_RECOGNIZE` clause around the filtered rows.
//!
//! ## Modes
//!
//! | Mode | Helper CTEs | Requires |
//! |------|-------------|----------|
//! | `basic` | `ranges`, `prefilter` | a window over the pattern, unless the subsequence holds both end symbols |
//! | `bucket` | `input_bucketized`, `ranges`, `buckets`, `prefilter` | a window over the pattern |
//!
//! ## Example
//!
//! ```
//! use prefilter::{rewrite, ClauseModel, RewriteMode, RewriteOptions, Subsequence};
//!
//! let model = ClauseModel::builder()
//!     .source("crimes")
//!     .order_by("time")
//!     .pattern("R Z* B Z* M")
//!     .define("R", "primary_type = 'ROBBERY'")
//!     .define("B", "primary_type = 'BATTERY' AND abs(B.lat - R.lat) <= 0.01")
//!     .define("M", "primary_type = 'ARREST' AND M.time - R.time <= INTERVAL '30' MINUTE")
//!     .build()
//!     .unwrap();
//!
//! let query = rewrite(
//!     &model,
//!     RewriteMode::Basic,
//!     &Subsequence::parse("R B"),
//!     &RewriteOptions::default(),
//! )
//! .unwrap();
//! assert!(query.sql().starts_with("WITH ranges AS ("));
//! ```

pub mod assemble;
pub mod bucket;
pub mod classify;
pub mod common;
pub mod define;
pub mod error;
pub mod join;
pub mod model;
pub mod options;
pub mod pattern;
pub mod range;
pub mod rewrite;
pub mod validity;

pub use assemble::RewrittenQuery;
pub use error::RewriteError;
pub use model::{ClauseModel, Subsequence};
pub use options::{Dialect, RewriteMode, RewriteOptions};
pub use rewrite::rewrite;
