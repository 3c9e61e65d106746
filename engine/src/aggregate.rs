//! Column aggregation over a displayed page.
//!
//! Aggregation is not a pipeline stage: the renderer computes summaries per
//! displayed page, after pagination, so the numbers always describe what the
//! user sees.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::Column;
use crate::{value, Record};

/// Built-in aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

/// Aggregate a column over a record set.
///
/// Only values with a finite numeric form contribute: numbers and numeric
/// strings count, everything else is excluded rather than treated as zero.
/// Edge results follow from the definitions: the sum of nothing is 0, the
/// average of nothing is NaN, and min/max of nothing are +inf/-inf. `Count`
/// counts contributing values, not records.
pub fn aggregate(records: &[Record], column: &Column, kind: AggregateKind) -> f64 {
    let values = numeric_values(records, column);

    match kind {
        AggregateKind::Sum => values.iter().sum(),
        AggregateKind::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateKind::Count => values.len() as f64,
        AggregateKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn numeric_values(records: &[Record], column: &Column) -> Vec<f64> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| numeric(column, record, index))
        .collect()
}

/// Resolve the cell through the column's value getter when present, then
/// keep it only if it is a finite number.
fn numeric(column: &Column, record: &Record, index: usize) -> Option<f64> {
    let parsed = match &column.value_getter {
        Some(getter) => parse(&getter(record, index)),
        None => parse(value::field_value(record, &column.field)),
    };
    parsed.filter(|n| n.is_finite())
}

fn parse(value: &Value) -> Option<f64> {
    value::as_number(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amount() -> Column {
        Column::new("amount", "Amount")
    }

    #[test]
    fn sum_skips_non_numeric() {
        let records = vec![
            json!({}),
            json!({"amount": "a"}),
            json!({"amount": 2}),
            json!({"amount": 4}),
        ];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Sum), 6.0);
    }

    #[test]
    fn numeric_strings_contribute() {
        let records = vec![json!({"amount": "2.5"}), json!({"amount": 1.5})];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Sum), 4.0);
    }

    #[test]
    fn count_counts_numeric_values_not_records() {
        let records = vec![
            json!({"amount": 1}),
            json!({"amount": null}),
            json!({"amount": "x"}),
            json!({"amount": "3"}),
        ];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Count), 2.0);
    }

    #[test]
    fn avg_of_nothing_is_nan() {
        let records = vec![json!({"amount": "x"})];
        assert!(aggregate(&records, &amount(), AggregateKind::Avg).is_nan());
    }

    #[test]
    fn avg_of_values() {
        let records = vec![json!({"amount": 2}), json!({"amount": 4})];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Avg), 3.0);
    }

    #[test]
    fn min_max_of_nothing_are_infinities() {
        let records: Vec<Record> = vec![];
        assert_eq!(
            aggregate(&records, &amount(), AggregateKind::Min),
            f64::INFINITY
        );
        assert_eq!(
            aggregate(&records, &amount(), AggregateKind::Max),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn min_max_of_values() {
        let records = vec![
            json!({"amount": 7}),
            json!({"amount": -2}),
            json!({"amount": 4}),
        ];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Min), -2.0);
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Max), 7.0);
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        let records: Vec<Record> = vec![];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Sum), 0.0);
    }

    #[test]
    fn value_getter_overrides_field() {
        let column = Column::new("amount", "Amount")
            .with_value_getter(|record, _index| json!(record["net"].as_f64().unwrap_or(0.0) * 2.0));
        let records = vec![json!({"net": 3, "amount": 100})];

        assert_eq!(aggregate(&records, &column, AggregateKind::Sum), 6.0);
    }

    #[test]
    fn booleans_do_not_contribute() {
        let records = vec![json!({"amount": true}), json!({"amount": 5})];
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Sum), 5.0);
        assert_eq!(aggregate(&records, &amount(), AggregateKind::Count), 1.0);
    }
}
