// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Common types and utilities shared across the rewrite stages.

pub mod duration;
pub mod sql;
