// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Executes generated prefilters on `DuckDB` and compares the kept rows with
//! a brute-force matcher.
//!
//! `DuckDB` has no `MATCH_RECOGNIZE`, so only the prefilter query runs; the
//! matcher stands in for the pattern-matching step.

use std::collections::BTreeSet;

use duckdb::{params, Connection};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use prefilter::{rewrite, ClauseModel, Dialect, RewriteMode, RewriteOptions, Subsequence};

const KINDS: [&str; 4] = ["ROBBERY", "BATTERY", "ARREST", "OTHER"];
const WINDOW: i64 = 30;

#[derive(Debug, Clone)]
struct Event {
    id: i64,
    ts: i64,
    category: &'static str,
    x: i64,
}

fn crimes_model() -> ClauseModel {
    ClauseModel::builder()
        .source("events")
        .order_by("ts")
        .pattern("R Z* B Z* M")
        .define("R", "category = 'ROBBERY'")
        .define("B", "category = 'BATTERY' AND abs(B.x - R.x) <= 2")
        .define(
            "M",
            "category = 'ARREST' AND abs(M.x - R.x) <= 2 AND M.ts - R.ts <= 30",
        )
        .build()
        .unwrap()
}

fn load(events: &[Event]) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE events (id BIGINT, ts BIGINT, category VARCHAR, x BIGINT)")
        .unwrap();
    for e in events {
        conn.execute(
            "INSERT INTO events VALUES (?, ?, ?, ?)",
            params![e.id, e.ts, e.category, e.x],
        )
        .unwrap();
    }
    conn
}

fn kept_ids(conn: &Connection, sql: &str) -> BTreeSet<i64> {
    let mut stmt = conn.prepare(sql).unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0)).unwrap();
    rows.map(Result::unwrap).collect()
}

/// Ids of every row covered by some `R Z* B Z* M` match.
fn matched_ids(events: &[Event]) -> BTreeSet<i64> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| (e.ts, e.id));
    let mut ids = BTreeSet::new();
    for (i, r) in sorted.iter().enumerate() {
        if r.category != "ROBBERY" {
            continue;
        }
        for (j, b) in sorted.iter().enumerate().skip(i + 1) {
            if b.category != "BATTERY" || (b.x - r.x).abs() > 2 {
                continue;
            }
            for (k, m) in sorted.iter().enumerate().skip(j + 1) {
                if m.category == "ARREST" && (m.x - r.x).abs() <= 2 && m.ts - r.ts <= WINDOW {
                    ids.extend(sorted[i..=k].iter().map(|e| e.id));
                }
            }
        }
    }
    ids
}

fn events_strategy() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec((0i64..8, 0usize..KINDS.len(), 0i64..6), 0..40).prop_map(|rows| {
        let mut ts = 0;
        rows.into_iter()
            .enumerate()
            .map(|(i, (gap, kind, x))| {
                ts += gap;
                Event {
                    id: i as i64,
                    ts,
                    category: KINDS[kind],
                    x,
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prefilter_keeps_every_matched_row(
        events in events_strategy(),
        subsequence in prop::sample::select(vec!["R", "R B", "R M", "R B M"]),
        bucket in any::<bool>(),
        divisions in 1u32..4,
    ) {
        let mode = if bucket { RewriteMode::Bucket } else { RewriteMode::Basic };
        let options = RewriteOptions::default()
            .with_dialect(Dialect::DuckDb)
            .with_bucket_divisions(std::num::NonZeroU32::new(divisions).unwrap());
        let query = rewrite(&crimes_model(), mode, &Subsequence::parse(subsequence), &options)
            .unwrap();

        let conn = load(&events);
        let kept = kept_ids(&conn, &query.prefilter_query());
        let matched = matched_ids(&events);
        prop_assert!(
            matched.is_subset(&kept),
            "{mode} prefilter on {subsequence} dropped {:?}",
            matched.difference(&kept).collect::<Vec<_>>()
        );
    }
}

#[test]
fn adjacent_buckets_retained() {
    let model = ClauseModel::builder()
        .source("events")
        .order_by("ts")
        .pattern("R Z* M")
        .define("R", "category = 'ROBBERY'")
        .define("M", "M.category = 'ARREST' AND M.ts - R.ts <= 30")
        .build()
        .unwrap();
    let events = [
        Event { id: 1, ts: 29, category: "ROBBERY", x: 0 },
        Event { id: 2, ts: 31, category: "ARREST", x: 0 },
        Event { id: 3, ts: 100, category: "OTHER", x: 0 },
        Event { id: 4, ts: 200, category: "ROBBERY", x: 0 },
        Event { id: 5, ts: 290, category: "ARREST", x: 0 },
    ];
    let conn = load(&events);
    let options = RewriteOptions::default().with_dialect(Dialect::DuckDb);

    for mode in [RewriteMode::Basic, RewriteMode::Bucket] {
        let query = rewrite(&model, mode, &Subsequence::parse("R M"), &options).unwrap();
        assert_eq!(
            kept_ids(&conn, &query.prefilter_query()),
            BTreeSet::from([1, 2]),
            "{mode}"
        );
    }
}

#[test]
fn partitions_do_not_mix() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE incidents (id BIGINT, ts BIGINT, district INTEGER, category VARCHAR);
         INSERT INTO incidents VALUES
            (1, 10, 1, 'ROBBERY'),
            (2, 20, 2, 'ARREST'),
            (3, 25, 1, 'ARREST'),
            (4, 22, 2, 'OTHER'),
            (5, 90, 1, 'OTHER');",
    )
    .unwrap();
    let model = ClauseModel::builder()
        .source("incidents")
        .order_by("ts")
        .partition_by("district")
        .pattern("R Z* M")
        .define("R", "category = 'ROBBERY'")
        .define("M", "category = 'ARREST' AND M.ts - R.ts <= 30")
        .build()
        .unwrap();
    let options = RewriteOptions::default().with_dialect(Dialect::DuckDb);

    for mode in [RewriteMode::Basic, RewriteMode::Bucket] {
        let query = rewrite(&model, mode, &Subsequence::parse("R M"), &options).unwrap();
        assert_eq!(
            kept_ids(&conn, &query.prefilter_query()),
            BTreeSet::from([1, 3]),
            "{mode}"
        );
    }
}

#[test]
fn duplicate_rows_preserved() {
    let events = [
        Event { id: 7, ts: 5, category: "ROBBERY", x: 1 },
        Event { id: 7, ts: 5, category: "ROBBERY", x: 1 },
        Event { id: 8, ts: 9, category: "BATTERY", x: 1 },
        Event { id: 9, ts: 12, category: "ARREST", x: 2 },
    ];
    let conn = load(&events);
    let options = RewriteOptions::default().with_dialect(Dialect::DuckDb);
    for mode in [RewriteMode::Basic, RewriteMode::Bucket] {
        let query = rewrite(&crimes_model(), mode, &Subsequence::parse("R B"), &options).unwrap();
        let count: i64 = conn
            .query_row(
                &format!("SELECT count(*) FROM ({})", query.prefilter_query()),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4, "{mode}");
    }
}
