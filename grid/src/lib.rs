//! # Sift Grid
//!
//! Async controller around the [`sift_engine`] query pipeline. It owns a
//! grid's state, debounces bursts of edits into single recomputations, runs
//! them against a local record set, a remote endpoint, or caller-supplied
//! code, and broadcasts each result on a watch channel.
//!
//! ## Design Principles
//!
//! - **Single writer**: one driver task owns the state; callers send
//!   commands and watch published updates.
//! - **Debounced**: edits apply to the state immediately, but execution
//!   waits out a quiet window, so ten keystrokes cost one run.
//! - **Monotonic**: runs are sequence-numbered and newer runs supersede
//!   older ones; a stale response is discarded, never published.
//! - **Resilient**: a failed run keeps the previous rows on screen and
//!   surfaces the error alongside them.
//!
//! ## Core Concepts
//!
//! - **Controller**: [`GridController`] spawns the driver and exposes the
//!   command surface (sorting, filtering, paging, grouping, searching).
//! - **Source**: [`DataSource`] picks the execution mode per run, local,
//!   remote, or provider.
//! - **Update**: [`GridUpdate`] carries the settled state, the page and
//!   total as one pair, footer summaries, and any error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use sift_engine::Column;
//! use sift_grid::{DataSource, GridConfig, GridController};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GridConfig::with_columns(vec![
//!         Column::from_field("name"),
//!         Column::from_field("age"),
//!     ]);
//!     let records = vec![
//!         json!({"name": "Alice", "age": 34}),
//!         json!({"name": "Bob", "age": 28}),
//!     ];
//!     let grid = GridController::new(config, DataSource::Local(records));
//!
//!     let mut updates = grid.subscribe();
//!     updates.changed().await.expect("grid dropped");
//!     let update = updates.borrow().clone();
//!     println!("{} of {} rows", update.result.rows.len(), update.result.total);
//!
//!     grid.set_search("ali");
//! }
//! ```
//!
//! ## Saved Layouts
//!
//! [`persist`] captures column visibility, sorts, filters, groups and page
//! size into a JSON snapshot behind a [`StateStorage`] key-value trait, and
//! restores them as a [`sift_engine::StateUpdate`].

pub mod config;
pub mod controller;
pub mod error;
pub mod persist;
pub mod source;
pub mod store;
pub mod transport;

// Re-export main types at crate root
pub use config::{CustomAggregate, GridConfig};
pub use controller::{GridController, GridUpdate};
pub use error::GridError;
pub use persist::{ColumnState, GridStateSnapshot, MemoryStorage, StateStorage, DEFAULT_STATE_KEY};
pub use source::{DataProvider, DataSource, RemoteConfig};
pub use store::StateStore;
pub use transport::{HttpTransport, Transport};
