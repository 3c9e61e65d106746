//! Loose value semantics shared by the filter, search, sort, and aggregate
//! engines.
//!
//! Records are plain JSON, so field values carry no schema. Every engine
//! reads them through the coercions here: a missing field is null, numeric
//! strings compare as numbers, and any value has a display string. Strict
//! variants can be layered on later without touching the call sites.

use std::cmp::Ordering;

use serde_json::Value;

static NULL: Value = Value::Null;

/// Look up a field on a record.
///
/// Missing fields and non-object records read as null.
pub fn field_value<'a>(record: &'a Value, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&NULL)
}

/// String form of a value as a cell would display it.
///
/// Arrays join their elements with commas; objects render as an opaque tag.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Numeric form of a value: numbers directly, numeric strings parsed.
///
/// Booleans and composites have no numeric form here; equality and ordering
/// handle booleans separately.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON type of a value, for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number_or_bool(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => as_number(other),
    }
}

/// Loose equality: `"5"` equals `5`, `true` equals `1`, null equals only null.
///
/// Same-type primitives compare directly; mixed numbers, numeric strings, and
/// booleans compare through their numeric form. Composites fall back to
/// structural equality.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => match (number_or_bool(a), number_or_bool(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => a == b,
    }
}

/// Loose ordering: two strings compare lexicographically, everything else
/// compares through its numeric form.
///
/// Null and non-coercible values have no ordering; comparisons against them
/// return `None` and the caller treats the predicate as false.
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => match (number_or_bool(a), number_or_bool(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}
