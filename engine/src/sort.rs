//! Multi-key sorting.
//!
//! Sorting is stable and non-destructive: ties under every key keep their
//! input order, and the input slice is never reordered in place. Keys are
//! tried in priority order; the first key that distinguishes two records
//! decides.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::state::{SortDirection, SortKey};
use crate::{value, Record};

/// Sort a record set by the given keys, returning an ordered copy.
///
/// With no keys the input order is preserved.
pub fn apply(records: &[Record], keys: &[SortKey]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    if keys.is_empty() {
        return sorted;
    }

    sorted.sort_by(|a, b| compare(a, b, keys));
    sorted
}

/// Compare two records under a key list.
///
/// Null and missing values sort last under every key regardless of
/// direction; the direction only flips comparisons between present values.
pub fn compare(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = value::field_value(a, &key.field);
        let right = value::field_value(b, &key.field);

        if left.is_null() && right.is_null() {
            continue;
        }
        if left.is_null() {
            return Ordering::Greater;
        }
        if right.is_null() {
            return Ordering::Less;
        }

        let ordering = compare_values(left, right);
        if ordering != Ordering::Equal {
            return match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
        }
    }

    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Value::Number(x), Value::Number(y)) = (a, b) {
        let x = x.as_f64().unwrap_or(f64::NAN);
        let y = y.as_f64().unwrap_or(f64::NAN);
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    if let (Some(x), Some(y)) = (instant(a), instant(b)) {
        return x.cmp(&y);
    }

    // Case-insensitive text comparison with a case-sensitive tiebreak, so
    // "apple" and "Apple" order deterministically
    let left = value::display_string(a);
    let right = value::display_string(b);
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(&right))
}

/// Timestamps travel as RFC 3339 strings; both sides must parse for the pair
/// to compare as instants.
fn instant(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok(),
        _ => None,
    }
}
