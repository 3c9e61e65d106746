//! Filter predicates and their evaluation.
//!
//! A flat predicate list is always AND-composed: a record survives only if
//! every predicate matches. Callers that need OR composition build a
//! [`FilterExpr`] tree instead of encoding logic flags on the predicates
//! themselves.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value;
use crate::{FieldName, Record};

/// Filter comparison operators.
///
/// Operator strings arriving from the outside may name operators this engine
/// does not know; those deserialize to [`FilterOperator::Unknown`] and match
/// every record rather than silently hiding data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    #[serde(other)]
    Unknown,
}

/// A single filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicate {
    /// Field the predicate reads
    pub field: FieldName,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Comparison value; an array for `in`/`notin`
    pub value: Value,
    /// Upper bound for `between`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
}

impl FilterPredicate {
    /// Create a predicate.
    pub fn new(field: impl Into<FieldName>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            value2: None,
        }
    }

    /// Create a `between` predicate with both bounds.
    pub fn between(field: impl Into<FieldName>, low: Value, high: Value) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Between,
            value: low,
            value2: Some(high),
        }
    }
}

/// How the branches of a composite filter combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLogic {
    And,
    Or,
}

/// A node in a filter expression tree: either a predicate or a composite
/// combining child expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    Predicate(FilterPredicate),
    Composite(CompositeFilter),
}

/// A composite filter combining child expressions with AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFilter {
    pub logic: FilterLogic,
    pub filters: Vec<FilterExpr>,
}

impl FilterExpr {
    /// AND of child expressions. Empty input is vacuously true.
    pub fn and(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::Composite(CompositeFilter {
            logic: FilterLogic::And,
            filters,
        })
    }

    /// OR of child expressions. Empty input matches nothing.
    pub fn or(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::Composite(CompositeFilter {
            logic: FilterLogic::Or,
            filters,
        })
    }
}

impl From<FilterPredicate> for FilterExpr {
    fn from(predicate: FilterPredicate) -> Self {
        FilterExpr::Predicate(predicate)
    }
}

/// Evaluate one predicate against a record.
pub fn matches(record: &Record, predicate: &FilterPredicate) -> bool {
    let value = value::field_value(record, &predicate.field);
    let target = &predicate.value;

    match predicate.operator {
        FilterOperator::Eq => value::loose_eq(value, target),
        FilterOperator::Neq => !value::loose_eq(value, target),
        FilterOperator::Lt => value::loose_cmp(value, target) == Some(Ordering::Less),
        FilterOperator::Lte => matches!(
            value::loose_cmp(value, target),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::Gt => value::loose_cmp(value, target) == Some(Ordering::Greater),
        FilterOperator::Gte => matches!(
            value::loose_cmp(value, target),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Contains => text_match(value, target, |hay, needle| hay.contains(needle)),
        FilterOperator::NotContains => {
            !text_match(value, target, |hay, needle| hay.contains(needle))
        }
        FilterOperator::StartsWith => {
            text_match(value, target, |hay, needle| hay.starts_with(needle))
        }
        FilterOperator::EndsWith => text_match(value, target, |hay, needle| hay.ends_with(needle)),
        FilterOperator::In => in_list(value, target),
        FilterOperator::NotIn => match target {
            Value::Array(_) => !in_list(value, target),
            _ => false,
        },
        FilterOperator::Between => match bound(&predicate.value2) {
            Some(upper) => {
                matches!(
                    value::loose_cmp(value, target),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    value::loose_cmp(value, upper),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            // A between with no upper bound restricts nothing
            None => true,
        },
        FilterOperator::IsNull => value.is_null(),
        FilterOperator::IsNotNull => !value.is_null(),
        FilterOperator::IsEmpty => is_empty(value),
        FilterOperator::IsNotEmpty => !is_empty(value),
        FilterOperator::Unknown => true,
    }
}

/// Evaluate a flat predicate list: a record passes only if every predicate
/// matches.
pub fn matches_all(record: &Record, predicates: &[FilterPredicate]) -> bool {
    predicates.iter().all(|predicate| matches(record, predicate))
}

/// Evaluate a filter expression tree.
pub fn matches_expr(record: &Record, expr: &FilterExpr) -> bool {
    match expr {
        FilterExpr::Predicate(predicate) => matches(record, predicate),
        FilterExpr::Composite(composite) => match composite.logic {
            FilterLogic::And => composite
                .filters
                .iter()
                .all(|child| matches_expr(record, child)),
            FilterLogic::Or => composite
                .filters
                .iter()
                .any(|child| matches_expr(record, child)),
        },
    }
}

/// Filter a record set, keeping the records that match every predicate.
pub fn apply(records: &[Record], predicates: &[FilterPredicate]) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches_all(record, predicates))
        .cloned()
        .collect()
}

fn text_match(value: &Value, target: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    // A null field has no text form, so contains is false and notcontains true
    if value.is_null() || target.is_null() {
        return false;
    }
    let haystack = value::display_string(value).to_lowercase();
    let needle = value::display_string(target).to_lowercase();
    test(&haystack, &needle)
}

/// Strict membership: the target must be an array, and elements match without
/// coercion, so `5` is not found in `["5"]`.
fn in_list(value: &Value, target: &Value) -> bool {
    match target {
        Value::Array(options) => options.iter().any(|option| strict_eq(value, option)),
        _ => false,
    }
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // Numbers are one type regardless of representation
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn bound(value2: &Option<Value>) -> Option<&Value> {
    value2.as_ref().filter(|upper| !upper.is_null())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        json!({
            "name": "Alice O'Brien",
            "age": 34,
            "city": "Oslo",
            "score": "88",
            "notes": "",
            "tags": ["admin", "staff"],
        })
    }

    fn check(field: &str, operator: FilterOperator, value: Value) -> bool {
        matches(&record(), &FilterPredicate::new(field, operator, value))
    }

    #[test]
    fn eq_is_loose() {
        assert!(check("age", FilterOperator::Eq, json!(34)));
        assert!(check("age", FilterOperator::Eq, json!("34")));
        assert!(check("score", FilterOperator::Eq, json!(88)));
        assert!(!check("age", FilterOperator::Eq, json!(35)));
    }

    #[test]
    fn neq_negates_eq() {
        assert!(!check("age", FilterOperator::Neq, json!("34")));
        assert!(check("age", FilterOperator::Neq, json!(35)));
    }

    #[test]
    fn ordered_comparisons() {
        assert!(check("age", FilterOperator::Lt, json!(40)));
        assert!(check("age", FilterOperator::Lte, json!(34)));
        assert!(check("age", FilterOperator::Gt, json!(30)));
        assert!(check("age", FilterOperator::Gte, json!("34")));
        // Numeric string fields coerce too
        assert!(check("score", FilterOperator::Gt, json!(80)));
    }

    #[test]
    fn comparisons_with_null_are_false() {
        assert!(!check("missing", FilterOperator::Lt, json!(10)));
        assert!(!check("missing", FilterOperator::Gte, json!(10)));
        assert!(!check("age", FilterOperator::Lt, json!(null)));
    }

    #[test]
    fn contains_case_insensitive() {
        assert!(check("name", FilterOperator::Contains, json!("o'brien")));
        assert!(check("city", FilterOperator::Contains, json!("OSL")));
        assert!(!check("city", FilterOperator::Contains, json!("x")));
        // Numbers match through their text form
        assert!(check("age", FilterOperator::Contains, json!(3)));
    }

    #[test]
    fn contains_null_field() {
        assert!(!check("missing", FilterOperator::Contains, json!("a")));
        // A null field cannot contain anything, so notcontains holds
        assert!(check("missing", FilterOperator::NotContains, json!("a")));
    }

    #[test]
    fn starts_and_ends_with() {
        assert!(check("name", FilterOperator::StartsWith, json!("alice")));
        assert!(!check("name", FilterOperator::StartsWith, json!("brien")));
        assert!(check("name", FilterOperator::EndsWith, json!("BRIEN")));
    }

    #[test]
    fn in_requires_array_and_strict_equality() {
        assert!(check("city", FilterOperator::In, json!(["Oslo", "Bergen"])));
        assert!(!check("city", FilterOperator::In, json!(["Bergen"])));
        // Strict: number 34 is not the string "34"
        assert!(!check("age", FilterOperator::In, json!(["34"])));
        assert!(check("age", FilterOperator::In, json!([34])));
        // Non-array target makes both membership operators false
        assert!(!check("city", FilterOperator::In, json!("Oslo")));
        assert!(!check("city", FilterOperator::NotIn, json!("Oslo")));
    }

    #[test]
    fn notin_excludes_members() {
        assert!(check("city", FilterOperator::NotIn, json!(["Bergen"])));
        assert!(!check("city", FilterOperator::NotIn, json!(["Oslo"])));
    }

    #[test]
    fn between_inclusive() {
        let inside = FilterPredicate::between("age", json!(30), json!(40));
        let edge = FilterPredicate::between("age", json!(34), json!(34));
        let outside = FilterPredicate::between("age", json!(40), json!(50));

        assert!(matches(&record(), &inside));
        assert!(matches(&record(), &edge));
        assert!(!matches(&record(), &outside));
    }

    #[test]
    fn between_without_upper_bound_is_vacuous() {
        let open = FilterPredicate::new("age", FilterOperator::Between, json!(100));
        assert!(matches(&record(), &open));

        let null_bound = FilterPredicate {
            value2: Some(json!(null)),
            ..FilterPredicate::new("age", FilterOperator::Between, json!(100))
        };
        assert!(matches(&record(), &null_bound));
    }

    #[test]
    fn null_and_empty_checks() {
        assert!(check("missing", FilterOperator::IsNull, json!(null)));
        assert!(!check("notes", FilterOperator::IsNull, json!(null)));
        assert!(check("notes", FilterOperator::IsEmpty, json!(null)));
        assert!(check("missing", FilterOperator::IsEmpty, json!(null)));
        assert!(check("name", FilterOperator::IsNotEmpty, json!(null)));
        assert!(check("name", FilterOperator::IsNotNull, json!(null)));
    }

    #[test]
    fn unknown_operator_fails_open() {
        let predicate: FilterPredicate =
            serde_json::from_value(json!({"field": "age", "operator": "regex", "value": ".*"}))
                .unwrap();
        assert_eq!(predicate.operator, FilterOperator::Unknown);
        assert!(matches(&record(), &predicate));
    }

    #[test]
    fn predicates_compose_with_and() {
        let records = vec![
            json!({"name": "Alice", "age": 34}),
            json!({"name": "Bob", "age": 34}),
            json!({"name": "Alan", "age": 28}),
        ];
        let predicates = vec![
            FilterPredicate::new("name", FilterOperator::StartsWith, json!("al")),
            FilterPredicate::new("age", FilterOperator::Gt, json!(30)),
        ];

        let filtered = apply(&records, &predicates);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["name"], "Alice");
    }

    #[test]
    fn expr_tree_or_logic() {
        let expr = FilterExpr::or(vec![
            FilterPredicate::new("city", FilterOperator::Eq, json!("Oslo")).into(),
            FilterPredicate::new("city", FilterOperator::Eq, json!("Bergen")).into(),
        ]);

        assert!(matches_expr(&record(), &expr));

        let expr = FilterExpr::and(vec![
            expr,
            FilterPredicate::new("age", FilterOperator::Lt, json!(30)).into(),
        ]);
        assert!(!matches_expr(&record(), &expr));
    }

    #[test]
    fn expr_tree_empty_composites() {
        assert!(matches_expr(&record(), &FilterExpr::and(vec![])));
        assert!(!matches_expr(&record(), &FilterExpr::or(vec![])));
    }

    #[test]
    fn expr_serialization_round_trip() {
        let expr = FilterExpr::or(vec![
            FilterPredicate::new("status", FilterOperator::Eq, json!("open")).into(),
            FilterExpr::and(vec![FilterPredicate::between(
                "age",
                json!(20),
                json!(30),
            )
            .into()]),
        ]);

        let json = serde_json::to_string(&expr).unwrap();
        assert!(json.contains("\"logic\":\"or\""));

        let parsed: FilterExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, parsed);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_operator() -> impl Strategy<Value = FilterOperator> {
            prop_oneof![
                Just(FilterOperator::Eq),
                Just(FilterOperator::Neq),
                Just(FilterOperator::Lt),
                Just(FilterOperator::Gte),
                Just(FilterOperator::Contains),
                Just(FilterOperator::IsNull),
                Just(FilterOperator::IsNotEmpty),
            ]
        }

        fn arb_record() -> impl Strategy<Value = Record> {
            (any::<i32>(), "[a-z]{0,8}", any::<bool>()).prop_map(|(age, name, flag)| {
                json!({"age": age, "name": name, "flag": flag})
            })
        }

        proptest! {
            #[test]
            fn prop_and_composition_equals_sequential_filtering(
                records in prop::collection::vec(arb_record(), 0..40),
                op1 in arb_operator(),
                op2 in arb_operator(),
                pivot in -50i32..50,
            ) {
                let p1 = FilterPredicate::new("age", op1, json!(pivot));
                let p2 = FilterPredicate::new("name", op2, json!("a"));

                let combined = apply(&records, &[p1.clone(), p2.clone()]);
                let sequential = apply(&apply(&records, &[p1]), &[p2]);

                prop_assert_eq!(combined, sequential);
            }

            #[test]
            fn prop_neq_complements_eq(
                records in prop::collection::vec(arb_record(), 0..40),
                pivot in -50i32..50,
            ) {
                let eq = FilterPredicate::new("age", FilterOperator::Eq, json!(pivot));
                let neq = FilterPredicate::new("age", FilterOperator::Neq, json!(pivot));

                let kept = apply(&records, &[eq]).len() + apply(&records, &[neq]).len();
                prop_assert_eq!(kept, records.len());
            }
        }
    }
}
