//! Query preprocessing for the standard parser.
//!
//! Runs before the tantivy query parser sees the text:
//! - Syntax check: unbalanced quotes or parentheses, a qualifier without a
//!   value and dangling boolean operators fail with a parse error naming
//!   the offending token
//! - Unknown field qualifiers are dropped so the term falls back to the
//!   default fields: `planet:mars` -> `mars`
//! - A URL-like value behind an unknown qualifier keeps its text with the
//!   colon escaped: `http://x` -> `http\://x`

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

use crate::core::error::{CatalogError, Result};

// Potential field prefixes (word:nonspace); position checks happen in code
static FIELD_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+):([^\s:])").expect("field prefix pattern is valid"));

const BINARY_OPERATORS: [&str; 4] = ["AND", "OR", "&&", "||"];

fn parse_error(token: &str, message: &str) -> CatalogError {
    CatalogError::Parse {
        token: token.to_string(),
        message: message.to_string(),
    }
}

fn is_binary_operator(word: &str) -> bool {
    BINARY_OPERATORS.contains(&word)
}

fn is_operator(word: &str) -> bool {
    is_binary_operator(word) || word == "NOT"
}

fn flush<'a>(query: &'a str, start: &mut Option<usize>, end: usize, words: &mut Vec<&'a str>) {
    if let Some(s) = start.take() {
        words.push(&query[s..end]);
    }
}

/// Check a query for malformed syntax.
///
/// # Examples
///
/// ```
/// use catalog_search::core::search::check_syntax;
///
/// assert!(check_syntax("release:\"Our Glorious 5 Year Plan\"").is_ok());
/// assert!(check_syntax("\"open quote").is_err());
/// assert!(check_syntax("rock AND").is_err());
/// ```
pub fn check_syntax(query: &str) -> Result<()> {
    let mut words: Vec<&str> = Vec::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<usize> = None;
    let mut open_parens: Vec<usize> = Vec::new();
    let mut escaped = false;

    for (i, c) in query.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            start.get_or_insert(i);
            continue;
        }
        if quote.is_some() {
            if c == '"' {
                quote = None;
            }
            continue;
        }

        match c {
            '"' => {
                quote = Some(i);
                start.get_or_insert(i);
            }
            '(' => {
                flush(query, &mut start, i, &mut words);
                open_parens.push(i);
            }
            ')' => {
                flush(query, &mut start, i, &mut words);
                if open_parens.pop().is_none() {
                    return Err(parse_error(")", "unbalanced closing parenthesis"));
                }
            }
            ':' => {
                let next = query[i + 1..].chars().next();
                if next.map_or(true, |n| n.is_whitespace() || n == ')') {
                    let word = &query[start.unwrap_or(i)..=i];
                    return Err(parse_error(word, "field qualifier without a value"));
                }
                start.get_or_insert(i);
            }
            c if c.is_whitespace() => flush(query, &mut start, i, &mut words),
            _ => {
                start.get_or_insert(i);
            }
        }
    }

    if let Some(q) = quote {
        return Err(parse_error(&query[q..], "unbalanced quote"));
    }
    if let Some(p) = open_parens.pop() {
        let token = query[p..].split_whitespace().next().unwrap_or("(");
        return Err(parse_error(token, "unbalanced opening parenthesis"));
    }
    flush(query, &mut start, query.len(), &mut words);

    if let Some(first) = words.first() {
        if is_binary_operator(first) {
            return Err(parse_error(first, "operator without a left operand"));
        }
    }
    if let Some(last) = words.last() {
        if is_operator(last) {
            return Err(parse_error(last, "operator without a right operand"));
        }
    }
    for pair in words.windows(2) {
        if is_operator(pair[0]) && is_binary_operator(pair[1]) {
            return Err(parse_error(pair[1], "operator follows another operator"));
        }
    }

    Ok(())
}

/// Byte ranges enclosed in double quotes
fn quoted_ranges(query: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    let mut escaped = false;
    for (i, c) in query.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => match open.take() {
                Some(s) => ranges.push(s..i + 1),
                None => open = Some(i),
            },
            _ => {}
        }
    }
    ranges
}

/// Drop qualifiers naming fields outside `known_fields`.
///
/// # Examples
///
/// ```
/// use catalog_search::core::search::strip_unknown_qualifiers;
///
/// let known = ["release", "artist"];
/// assert_eq!(strip_unknown_qualifiers("planet:mars", &known), "mars");
/// assert_eq!(strip_unknown_qualifiers("artist:queen", &known), "artist:queen");
/// assert_eq!(strip_unknown_qualifiers("a:b:mars", &known), "mars");
/// ```
pub fn strip_unknown_qualifiers(query: &str, known_fields: &[&str]) -> String {
    // Chained qualifiers only surface once the outer one is gone
    let mut current = strip_pass(query, known_fields);
    loop {
        let next = strip_pass(&current, known_fields);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_pass(query: &str, known_fields: &[&str]) -> String {
    let quoted = quoted_ranges(query);
    let mut result = String::with_capacity(query.len());
    let mut copied = 0;

    for cap in FIELD_PREFIX_PATTERN.captures_iter(query) {
        let (Some(whole), Some(field)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        // Only a prefix at the start, after whitespace or an opening group
        let mut before = query[..whole.start()].chars().rev();
        let prefix_ok = match before.next() {
            None => true,
            Some(c) if c.is_whitespace() || c == '(' => true,
            Some('+' | '-') => before
                .next()
                .map_or(true, |c| c.is_whitespace() || c == '('),
            _ => false,
        };
        if !prefix_ok || quoted.iter().any(|r| r.contains(&whole.start())) {
            continue;
        }
        if known_fields.contains(&field.as_str()) {
            continue;
        }

        let colon = field.end();
        result.push_str(&query[copied..field.start()]);
        if cap[2].starts_with('/') {
            result.push_str(field.as_str());
            result.push_str("\\:");
        } else {
            debug!("Dropping unknown field qualifier '{}'", field.as_str());
        }
        copied = colon + 1;
    }

    result.push_str(&query[copied..]);
    result
}

/// Prepare a query for the standard parser.
///
/// Returns the empty string for blank input.
pub fn preprocess_query(query: &str, known_fields: &[&str]) -> Result<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    check_syntax(trimmed)?;
    Ok(strip_unknown_qualifiers(trimmed, known_fields))
}
