// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Small SQL text helpers shared by the builders.

/// Returns the body of the first `MATCH_RECOGNIZE ( ... )` in `query`.
///
/// The body is everything between the opening parenthesis and its matching
/// closing parenthesis, trimmed. Parentheses inside string literals and
/// quoted identifiers are ignored, so nested groups like `PATTERN (A B+)`
/// and calls like `PREV(price)` do not end the clause early.
///
/// Returns `None` if the keyword is missing or the parentheses are unbalanced.
///
/// # Examples
///
/// ```
/// use prefilter::common::sql::extract_match_recognize;
///
/// let q = "SELECT * FROM t MATCH_RECOGNIZE (ORDER BY ts PATTERN (A B) DEFINE B AS B.x > A.x) AS m";
/// assert_eq!(
///     extract_match_recognize(q),
///     Some("ORDER BY ts PATTERN (A B) DEFINE B AS B.x > A.x")
/// );
/// ```
#[must_use]
pub fn extract_match_recognize(query: &str) -> Option<&str> {
    const KEYWORD: &[u8] = b"MATCH_RECOGNIZE";
    let bytes = query.as_bytes();
    let start = find_keyword(bytes, KEYWORD)?;

    let mut pos = start + KEYWORD.len();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    let body_start = pos + 1;

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = pos;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => {
                // Doubled quote is an escaped quote character
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(query[body_start..i].trim());
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Finds `keyword` case-insensitively at an identifier boundary.
fn find_keyword(haystack: &[u8], keyword: &[u8]) -> Option<usize> {
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    haystack
        .windows(keyword.len())
        .enumerate()
        .find(|&(i, window)| {
            window.eq_ignore_ascii_case(keyword)
                && (i == 0 || !is_ident(haystack[i - 1]))
                && haystack
                    .get(i + keyword.len())
                    .map_or(true, |&b| !is_ident(b))
        })
        .map(|(i, _)| i)
}

/// Renders a `WHERE` clause body, one condition per line.
///
/// Returns `None` for an empty condition list so callers can omit `WHERE`.
pub(crate) fn where_clause(conditions: &[String], indent: &str) -> Option<String> {
    let (first, rest) = conditions.split_first()?;
    let mut out = format!("{indent}WHERE {first}");
    for cond in rest {
        out.push('\n');
        out.push_str(indent);
        out.push_str("\tAND ");
        out.push_str(cond);
    }
    Some(out)
}
