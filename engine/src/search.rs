//! Free-text search across columns.
//!
//! Search is the first pipeline stage: it narrows the record set before the
//! structured filters run. A record matches when any filterable column
//! contains the term, so the composition is OR across columns and AND with
//! everything downstream.

use crate::column::Column;
use crate::{value, Record};

/// Filter records by a free-text term.
///
/// The term is trimmed and matched case-insensitively; a term that is empty
/// after trimming leaves the record set unchanged. Null and missing fields
/// never match.
pub fn apply(records: &[Record], term: &str, columns: &[Column]) -> Vec<Record> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| matches(record, &needle, columns))
        .cloned()
        .collect()
}

fn matches(record: &Record, needle: &str, columns: &[Column]) -> bool {
    columns.iter().any(|column| {
        if !column.filterable {
            return false;
        }

        let value = value::field_value(record, &column.field);
        if value.is_null() {
            return false;
        }

        value::display_string(value).to_lowercase().contains(needle)
    })
}
