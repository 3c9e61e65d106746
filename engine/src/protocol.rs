//! Remote query translation.
//!
//! When execution is delegated to a backend, the current [`QueryState`] is
//! rendered into the flat parameter set such backends expect, and their
//! responses are read back into a [`QueryResult`]. Both directions are pure
//! functions; nothing here performs IO.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::{FilterOperator, FilterPredicate};
use crate::pipeline::QueryResult;
use crate::state::QueryState;
use crate::value;

/// Which response shape a remote endpoint speaks.
///
/// Requests are identical across versions; the version documents what the
/// endpoint will send back, and [`parse_response`] detects the shape on its
/// own either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Nested responses, `{"data": {"results": [...], "count": n}}`
    V1,
    /// Flat responses, `{"value": [...], "totalCount": n}`
    #[default]
    V2,
}

/// Ordered query parameters for one remote fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolRequest {
    pub params: Vec<(String, String)>,
}

impl ProtocolRequest {
    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Render a state into request parameters.
///
/// Always emits `top`, `skip` and `count=true`; `orderby` and `filter` appear
/// only when the state carries sort keys or predicates. Caller-supplied
/// `extra` pairs are appended verbatim after the derived ones.
pub fn build_request(state: &QueryState, extra: &[(String, String)]) -> ProtocolRequest {
    let mut params = vec![
        ("top".to_string(), state.take.to_string()),
        ("skip".to_string(), state.skip.to_string()),
        ("count".to_string(), "true".to_string()),
    ];

    if !state.sort.is_empty() {
        let orderby = state
            .sort
            .iter()
            .map(|key| format!("{} {}", key.field, key.direction))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("orderby".to_string(), orderby));
    }
    if let Some(filter) = build_filter(&state.filter) {
        params.push(("filter".to_string(), filter));
    }
    params.extend(extra.iter().cloned());

    ProtocolRequest { params }
}

/// Render predicates into one filter expression, fragments joined with `and`.
///
/// Predicates without a protocol form contribute nothing; `None` means no
/// predicate could be translated.
pub fn build_filter(predicates: &[FilterPredicate]) -> Option<String> {
    let fragments: Vec<String> = predicates.iter().filter_map(fragment).collect();
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" and "))
    }
}

/// Read a response body in either recognized shape.
///
/// The total comes from the explicit count field when the endpoint sent one,
/// even zero; without one it falls back to the returned page length.
pub fn parse_response(body: &Value) -> Result<QueryResult> {
    if let Some(rows) = body.get("value").and_then(Value::as_array) {
        let total = body
            .get("totalCount")
            .and_then(count_from)
            .unwrap_or(rows.len());
        return Ok(QueryResult {
            rows: rows.clone(),
            total,
        });
    }

    if let Some(data) = body.get("data") {
        if let Some(rows) = data.as_array() {
            return Ok(QueryResult {
                rows: rows.clone(),
                total: rows.len(),
            });
        }
        if let Some(rows) = data.get("results").and_then(Value::as_array) {
            let total = data.get("count").and_then(count_from).unwrap_or(rows.len());
            return Ok(QueryResult {
                rows: rows.clone(),
                total,
            });
        }
    }

    Err(Error::UnrecognizedResponse(shape_of(body)))
}

fn fragment(predicate: &FilterPredicate) -> Option<String> {
    let field = &predicate.field;
    let value = &predicate.value;

    match predicate.operator {
        FilterOperator::Eq => Some(comparison(field, "eq", value)),
        FilterOperator::Neq => Some(comparison(field, "ne", value)),
        FilterOperator::Lt => Some(comparison(field, "lt", value)),
        FilterOperator::Lte => Some(comparison(field, "le", value)),
        FilterOperator::Gt => Some(comparison(field, "gt", value)),
        FilterOperator::Gte => Some(comparison(field, "ge", value)),
        FilterOperator::Contains => Some(function(field, "contains", value)),
        FilterOperator::StartsWith => Some(function(field, "startswith", value)),
        FilterOperator::EndsWith => Some(function(field, "endswith", value)),
        FilterOperator::In => in_fragment(field, value),
        // Negations, ranges and null checks have no protocol form.
        _ => None,
    }
}

fn comparison(field: &str, op: &str, value: &Value) -> String {
    format!("{} {} {}", field, op, literal(value))
}

fn function(field: &str, name: &str, value: &Value) -> String {
    format!("{}({}, {})", name, field, quoted(&value::display_string(value)))
}

/// OR of per-element equality checks; elements are always quoted. An empty
/// list translates to nothing rather than an unsatisfiable `()`.
fn in_fragment(field: &str, value: &Value) -> Option<String> {
    let elements: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    if elements.is_empty() {
        return None;
    }

    let parts: Vec<String> = elements
        .iter()
        .map(|item| format!("{} eq {}", field, quoted(&value::display_string(item))))
        .collect();
    Some(format!("({})", parts.join(" or ")))
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quoted(s),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => quoted(&value::display_string(value)),
        other => other.to_string(),
    }
}

/// Embedded quotes are doubled, so `O'Brien` becomes `'O''Brien'`.
fn quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn count_from(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn shape_of(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        other => value::type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SortKey;
    use serde_json::json;

    #[test]
    fn request_always_carries_paging_and_count() {
        let request = build_request(&QueryState::default(), &[]);

        assert_eq!(request.get("top"), Some("25"));
        assert_eq!(request.get("skip"), Some("0"));
        assert_eq!(request.get("count"), Some("true"));
        assert_eq!(request.get("orderby"), None);
        assert_eq!(request.get("filter"), None);
    }

    #[test]
    fn orderby_joins_keys_with_commas() {
        let state = QueryState {
            sort: vec![SortKey::desc("age"), SortKey::asc("name")],
            ..QueryState::default()
        };
        let request = build_request(&state, &[]);

        assert_eq!(request.get("orderby"), Some("age desc,name asc"));
    }

    #[test]
    fn filter_values_escape_embedded_quotes() {
        let state = QueryState {
            skip: 20,
            take: 10,
            sort: vec![SortKey::desc("age")],
            filter: vec![FilterPredicate::new(
                "name",
                FilterOperator::Contains,
                json!("O'Brien"),
            )],
            ..QueryState::default()
        };
        let request = build_request(&state, &[]);

        assert_eq!(request.get("top"), Some("10"));
        assert_eq!(request.get("skip"), Some("20"));
        assert_eq!(request.get("orderby"), Some("age desc"));
        assert_eq!(request.get("filter"), Some("contains(name, 'O''Brien')"));
    }

    #[test]
    fn comparison_operators_use_protocol_names() {
        let predicates = vec![
            FilterPredicate::new("age", FilterOperator::Gte, json!(21)),
            FilterPredicate::new("age", FilterOperator::Lte, json!(65)),
            FilterPredicate::new("name", FilterOperator::Neq, json!("bob")),
        ];

        assert_eq!(
            build_filter(&predicates).as_deref(),
            Some("age ge 21 and age le 65 and name ne 'bob'")
        );
    }

    #[test]
    fn string_values_are_quoted_and_others_are_not() {
        let quoted = vec![FilterPredicate::new("name", FilterOperator::Eq, json!("a"))];
        let bare = vec![FilterPredicate::new("age", FilterOperator::Eq, json!(7))];

        assert_eq!(build_filter(&quoted).as_deref(), Some("name eq 'a'"));
        assert_eq!(build_filter(&bare).as_deref(), Some("age eq 7"));
    }

    #[test]
    fn in_expands_to_parenthesized_or() {
        let predicates = vec![FilterPredicate::new(
            "status",
            FilterOperator::In,
            json!([1, "two"]),
        )];

        assert_eq!(
            build_filter(&predicates).as_deref(),
            Some("(status eq '1' or status eq 'two')")
        );
    }

    #[test]
    fn in_with_a_scalar_is_a_singleton() {
        let predicates = vec![FilterPredicate::new("status", FilterOperator::In, json!(3))];

        assert_eq!(build_filter(&predicates).as_deref(), Some("(status eq '3')"));
    }

    #[test]
    fn empty_in_list_contributes_nothing() {
        let predicates = vec![
            FilterPredicate::new("status", FilterOperator::In, json!([])),
            FilterPredicate::new("age", FilterOperator::Gt, json!(1)),
        ];

        assert_eq!(build_filter(&predicates).as_deref(), Some("age gt 1"));
    }

    #[test]
    fn untranslatable_operators_are_dropped() {
        let predicates = vec![
            FilterPredicate::between("age", json!(1), json!(9)),
            FilterPredicate::new("name", FilterOperator::IsNull, json!(null)),
            FilterPredicate::new("name", FilterOperator::Contains, json!("a")),
        ];

        assert_eq!(
            build_filter(&predicates).as_deref(),
            Some("contains(name, 'a')")
        );
        assert_eq!(build_filter(&predicates[..2]), None);
    }

    #[test]
    fn extra_params_append_verbatim() {
        let extra = vec![("format".to_string(), "json".to_string())];
        let request = build_request(&QueryState::default(), &extra);

        assert_eq!(request.get("format"), Some("json"));
        assert_eq!(request.params.last().unwrap().0, "format");
    }

    #[test]
    fn parses_flat_shape() {
        let body = json!({"value": [{"id": 1}, {"id": 2}], "totalCount": 57});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.total, 57);
    }

    #[test]
    fn flat_shape_without_count_falls_back_to_page_length() {
        let body = json!({"value": [{"id": 1}, {"id": 2}, {"id": 3}]});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.total, 3);
    }

    #[test]
    fn explicit_zero_count_is_honored() {
        let body = json!({"value": [{"id": 1}], "totalCount": 0});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.total, 0);
    }

    #[test]
    fn parses_nested_shape_with_results() {
        let body = json!({"data": {"results": [{"id": 1}], "count": 41}});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.rows, vec![json!({"id": 1})]);
        assert_eq!(result.total, 41);
    }

    #[test]
    fn nested_count_may_arrive_as_a_string() {
        let body = json!({"data": {"results": [{"id": 1}], "count": "41"}});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.total, 41);
    }

    #[test]
    fn parses_nested_bare_array() {
        let body = json!({"data": [{"id": 1}, {"id": 2}]});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.total, 2);
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        let body = json!({"items": [], "meta": {}});
        let err = parse_response(&body).unwrap_err();

        match err {
            Error::UnrecognizedResponse(shape) => {
                assert!(shape.contains("items"));
                assert!(shape.contains("meta"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        let err = parse_response(&json!([1, 2, 3])).unwrap_err();

        assert_eq!(
            err,
            Error::UnrecognizedResponse("array".to_string())
        );
    }

    #[test]
    fn round_trip_reproduces_records_and_count() {
        let state = QueryState {
            skip: 20,
            take: 10,
            sort: vec![SortKey::desc("age")],
            filter: vec![FilterPredicate::new(
                "name",
                FilterOperator::Contains,
                json!("O'Brien"),
            )],
            ..QueryState::default()
        };
        let request = build_request(&state, &[]);
        assert!(request.get("filter").is_some());

        let records = vec![json!({"name": "O'Brien", "age": 34})];
        let body = json!({"value": records.clone(), "totalCount": 1});
        let result = parse_response(&body).unwrap();

        assert_eq!(result.rows, records);
        assert_eq!(result.total, 1);
    }

    #[test]
    fn version_defaults_to_flat() {
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::V2);
        assert_eq!(
            serde_json::to_string(&ProtocolVersion::V1).unwrap(),
            "\"v1\""
        );
    }
}
