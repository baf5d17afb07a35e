// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! `PATTERN` clause parsing.
//!
//! Only concatenation patterns are rewritable. Every element is a symbol,
//! optionally followed by `*`:
//!
//! ```text
//! R         : exactly one row classified as R
//! Z*        : zero or more rows classified as Z (a gap separator)
//! (R Z* M)  : optional enclosing parentheses
//! ```
//!
//! Alternation (`|`), nested groups, `+`, `?`, `{n,m}`, reluctant `*?`,
//! anchors, exclusions and `PERMUTE` are rejected as
//! [`UnsupportedPatternShape`](crate::error::RewriteError::UnsupportedPatternShape).

pub mod parser;
