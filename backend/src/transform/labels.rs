//! Identifier normalization: free-text descriptions to unique snake_case labels.
//!
//! ```text
//! "Full-time worker: ASC"  →  "full_time_worker_a_s_c"
//! ["Other", "Other"]       →  ["other_1", "other_2"]
//! ```
//!
//! Normalization runs in two stages. [`to_underscore_case`] rewrites each
//! string on its own; [`uniquify`] then suffixes every occurrence of a string
//! that appears more than once, the first occurrence included.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::{LabelError, LabelResult};

/// Runs of anything that is not a word character.
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").expect("valid regex"));

/// Runs of underscores.
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// Prefix marking a comment row; such descriptions are kept verbatim.
pub const COMMENT_PREFIX: char = '#';

/// Normalize one description.
pub fn normalize_description(s: &str) -> String {
    if s.starts_with(COMMENT_PREFIX) {
        return s.to_string();
    }

    let s = s.replace([' ', '-', ':'], "_");
    let s = split_camel_case(&s);
    let s = s.to_lowercase();
    let s = NON_WORD.replace_all(&s, "_");
    let s = s.trim_matches('_');
    UNDERSCORES.replace_all(s, "_").into_owned()
}

/// Insert `_` before each ASCII uppercase letter that neither starts the
/// string nor follows an underscore.
fn split_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    let mut prev: Option<char> = None;

    for c in s.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| p != '_') {
            out.push('_');
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

/// Normalize every description, order preserved.
pub fn to_underscore_case<S: AsRef<str>>(descriptions: &[S]) -> Vec<String> {
    descriptions
        .iter()
        .map(|s| normalize_description(s.as_ref()))
        .collect()
}

/// Make every string unique by numbering duplicates.
///
/// A string occurring more than once gets `_1`, `_2`, ... on each occurrence
/// in order. Strings occurring once are returned unchanged. A suffixed name
/// that would clash with another output is skipped over, so `["a", "a", "a_1"]`
/// becomes `["a_2", "a_3", "a_1"]`.
pub fn uniquify<S: AsRef<str>>(strings: &[S]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in strings {
        *counts.entry(s.as_ref()).or_insert(0) += 1;
    }

    let mut taken: HashSet<String> = counts
        .iter()
        .filter(|(_, n)| **n == 1)
        .map(|(s, _)| s.to_string())
        .collect();

    let mut suffixes: HashMap<&str, usize> = HashMap::new();
    strings
        .iter()
        .map(|s| {
            let s = s.as_ref();
            if counts[s] == 1 {
                return s.to_string();
            }
            let n = suffixes.entry(s).or_insert(0);
            loop {
                *n += 1;
                let candidate = format!("{}_{}", s, n);
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Both normalization stages.
pub fn normalize_labels<S: AsRef<str>>(descriptions: &[S]) -> Vec<String> {
    uniquify(&to_underscore_case(descriptions))
}

/// Normalize cells that may be empty. Any empty cell is rejected.
pub fn labels_from_cells<S: AsRef<str>>(cells: &[Option<S>]) -> LabelResult<Vec<String>> {
    let texts = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            cell.as_ref().map(|s| s.as_ref()).ok_or_else(|| {
                LabelError::InvalidInputKind(format!("element {} is null, expected text", i))
            })
        })
        .collect::<LabelResult<Vec<&str>>>()?;

    Ok(normalize_labels(&texts))
}

/// Normalize a JSON array of strings.
///
/// Fails with [`LabelError::InvalidInputKind`] when `value` is not an array or
/// when any element is not a string.
pub fn labels_from_json(value: &Value) -> LabelResult<Vec<String>> {
    let items = value.as_array().ok_or_else(|| {
        LabelError::InvalidInputKind(format!(
            "expected a sequence of strings, got {}",
            value_kind(value)
        ))
    })?;

    let texts = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().ok_or_else(|| {
                LabelError::InvalidInputKind(format!(
                    "element {} is {}, expected text",
                    i,
                    value_kind(item)
                ))
            })
        })
        .collect::<LabelResult<Vec<&str>>>()?;

    Ok(normalize_labels(&texts))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
