// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! `DEFINE` condition parsing.
//!
//! Turns the text of one `symbol AS <condition>` entry into an
//! [`Expr`](crate::model::expr::Expr). Column references keep their
//! qualifier as written; unqualified columns are attributed to the owning
//! symbol later, during classification.

pub mod parser;
