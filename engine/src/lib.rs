//! # Sift Engine
//!
//! A deterministic query engine for tabular data.
//!
//! This crate provides the core logic behind a data grid: query state,
//! filtering, global search, multi-key sorting, pagination, aggregation and
//! remote query translation - the same state and records always produce the
//! same page.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of network, storage, or rendering
//! - **Deterministic**: Same state and records always produce the same page
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Query state
//!
//! A [`QueryState`] is an immutable value describing one query:
//! - Page window (`skip`, `take`)
//! - Sort keys in priority order
//! - Filter predicates (AND-combined)
//! - Group keys
//! - Optional global search term
//!
//! State is replaced wholesale, never mutated: [`QueryState::merged`] applies
//! a partial [`StateUpdate`] and returns the next state, and
//! [`QueryState::toggled_sort`] yields the sort keys after a header click.
//!
//! ### Pipeline
//!
//! [`pipeline::execute`] runs the stages in a fixed order: search, then
//! filters, then sort, then pagination. The reported total is counted after
//! filtering and before pagination.
//!
//! ### Filters
//!
//! Records are plain JSON values; predicates compare with the loose semantics
//! spreadsheet users expect (`"5"` equals `5`), kept in the [`value`] module.
//! Predicates can also form explicit AND/OR trees via [`FilterExpr`].
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sift_engine::{pipeline, Column, FilterOperator, FilterPredicate, QueryState, SortKey};
//!
//! // 1. Describe the columns
//! let columns = vec![
//!     Column::new("name", "Name"),
//!     Column::new("age", "Age"),
//! ];
//!
//! // 2. Describe the query
//! let state = QueryState {
//!     filter: vec![FilterPredicate::new("age", FilterOperator::Gte, json!(30))],
//!     sort: vec![SortKey::desc("age")],
//!     ..QueryState::default()
//! };
//!
//! // 3. Run it over a record set
//! let records = vec![
//!     json!({"name": "Alice", "age": 34}),
//!     json!({"name": "Bob", "age": 28}),
//!     json!({"name": "Carol", "age": 41}),
//! ];
//! let result = pipeline::execute(&state, &records, &columns).unwrap();
//!
//! assert_eq!(result.total, 2);
//! assert_eq!(result.rows[0]["age"], json!(41));
//! ```
//!
//! ## Remote Execution
//!
//! When a backend executes the query instead, the [`protocol`] module renders
//! a [`QueryState`] into the backend's request parameters and reads either of
//! the two response shapes such backends return.
//!
//! ## Aggregation
//!
//! Column summaries (sum/avg/count/min/max) are computed per displayed page
//! with [`aggregate::aggregate`], outside the pipeline, so they always
//! describe the rows the user sees.

pub mod aggregate;
pub mod column;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod protocol;
pub mod search;
pub mod sort;
pub mod state;
pub mod value;

// Re-export main types at crate root
pub use aggregate::AggregateKind;
pub use column::{Column, Pinned, ValueGetter};
pub use error::Error;
pub use filter::{CompositeFilter, FilterExpr, FilterLogic, FilterOperator, FilterPredicate};
pub use pipeline::QueryResult;
pub use protocol::{ProtocolRequest, ProtocolVersion};
pub use state::{GroupKey, QueryState, SortDirection, SortKey, StateUpdate, DEFAULT_PAGE_SIZE};

/// Type aliases for clarity
pub type Record = serde_json::Value;
pub type FieldName = String;
