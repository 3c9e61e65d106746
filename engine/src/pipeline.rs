//! Query pipeline.
//!
//! Stages run in a fixed order: global search, then filters, then sort, then
//! pagination. The reported total is counted after filtering and before
//! pagination, so it always answers "how many rows match", not "how many rows
//! are on this page".

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::error::Result;
use crate::state::QueryState;
use crate::{filter, search, sort, Record};

/// One page of query output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Rows of the requested page, in final order
    pub rows: Vec<Record>,
    /// Matching rows across all pages
    pub total: usize,
}

/// Run the full pipeline and slice out the requested page.
///
/// A page past the end comes back empty with the total intact, so callers can
/// detect and correct an out-of-range `skip`.
pub fn execute(state: &QueryState, records: &[Record], columns: &[Column]) -> Result<QueryResult> {
    state.validate()?;

    let matched = prepared(state, records, columns);
    let total = matched.len();
    let rows = matched
        .into_iter()
        .skip(state.skip)
        .take(state.take)
        .collect();

    Ok(QueryResult { rows, total })
}

/// Run the pipeline without pagination; `skip` and `take` are ignored.
pub fn execute_unpaged(
    state: &QueryState,
    records: &[Record],
    columns: &[Column],
) -> Result<QueryResult> {
    state.validate()?;

    let rows = prepared(state, records, columns);
    let total = rows.len();

    Ok(QueryResult { rows, total })
}

fn prepared(state: &QueryState, records: &[Record], columns: &[Column]) -> Vec<Record> {
    let mut rows = match &state.search {
        Some(term) => search::apply(records, term, columns),
        None => records.to_vec(),
    };
    if !state.filter.is_empty() {
        rows = filter::apply(&rows, &state.filter);
    }
    if !state.sort.is_empty() {
        rows = sort::apply(&rows, &state.sort);
    }
    rows
}
