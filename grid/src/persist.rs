//! Saved grid state.
//!
//! A snapshot captures what a returning user expects to find again: column
//! layout, sorts, filters, groups and page size. Loading is tolerant by
//! contract - a malformed payload or a column that no longer exists must
//! never take the grid down, so failures degrade to "no saved state" with a
//! warning.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sift_engine::{Column, FilterPredicate, GroupKey, Pinned, QueryState, SortKey, StateUpdate};

use crate::error::{GridError, Result};

/// Storage key used when the caller does not pick one.
pub const DEFAULT_STATE_KEY: &str = "grid-state";

/// Key/value storage for serialized snapshots.
///
/// Modeled on web local storage; implementations decide durability.
pub trait StateStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Non-durable storage, mostly for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Persisted slice of one column's layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnState {
    pub field: String,
    pub visible: bool,
    pub width: Option<String>,
    pub pinned: Option<Pinned>,
}

/// Serialized grid state.
///
/// Every field is optional on the way in, so payloads from older layouts
/// restore whatever they do carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStateSnapshot {
    #[serde(default)]
    pub columns: Vec<ColumnState>,
    #[serde(default)]
    pub sorts: Option<Vec<SortKey>>,
    #[serde(default)]
    pub filters: Option<Vec<FilterPredicate>>,
    #[serde(default)]
    pub groups: Option<Vec<GroupKey>>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl GridStateSnapshot {
    /// Snapshot the current state and column layout.
    pub fn capture(state: &QueryState, columns: &[Column]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|column| ColumnState {
                    field: column.field.clone(),
                    visible: column.visible,
                    width: column.width.clone(),
                    pinned: column.pinned,
                })
                .collect(),
            sorts: Some(state.sort.clone()),
            filters: Some(state.filter.clone()),
            groups: Some(state.group.clone()),
            page_size: Some(state.take),
        }
    }

    /// Apply the saved layout onto `columns` and return the state portion as
    /// an update.
    ///
    /// Saved columns whose field no longer exists are skipped silently. A
    /// saved page size of zero is ignored rather than restored into an
    /// invalid state.
    pub fn restore(&self, columns: &mut [Column]) -> StateUpdate {
        for saved in &self.columns {
            if let Some(column) = columns.iter_mut().find(|c| c.field == saved.field) {
                column.visible = saved.visible;
                column.width = saved.width.clone();
                column.pinned = saved.pinned;
            }
        }

        StateUpdate {
            take: self.page_size.filter(|size| *size > 0),
            sort: self.sorts.clone(),
            filter: self.filters.clone(),
            group: self.groups.clone(),
            ..StateUpdate::default()
        }
    }
}

/// Serialize and store a snapshot under `key`.
pub fn save(storage: &dyn StateStorage, key: &str, snapshot: &GridStateSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(raw) => storage.set(key, &raw),
        Err(error) => {
            tracing::warn!(key = %key, error = %error, "Failed to serialize grid state")
        }
    }
}

/// Load and parse the snapshot under `key`.
///
/// A missing entry and a malformed one both come back as `None`; the
/// malformed case is logged and never surfaces as an error.
pub fn load(storage: &dyn StateStorage, key: &str) -> Option<GridStateSnapshot> {
    let raw = storage.get(key)?;
    match parse(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            tracing::warn!(key = %key, error = %error, "Ignoring saved grid state");
            None
        }
    }
}

/// Drop the snapshot under `key`.
pub fn clear(storage: &dyn StateStorage, key: &str) {
    storage.remove(key);
}

fn parse(raw: &str) -> Result<GridStateSnapshot> {
    serde_json::from_str(raw).map_err(|e| GridError::StateLoad(e.to_string()))
}
