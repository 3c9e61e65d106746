//! Query state - the single descriptor that drives every pipeline run.
//!
//! Holders treat the state as an immutable value: every user action produces
//! a new `QueryState`, usually by merging a partial [`StateUpdate`] over the
//! previous one. Nothing downstream ever mutates a state in place.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::FilterPredicate;
use crate::FieldName;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Direction of a sort or group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// A single sort key. Position in the sort list encodes priority:
/// index 0 is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    /// Field to sort by
    pub field: FieldName,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortKey {
    /// Create a sort key.
    pub fn new(field: impl Into<FieldName>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending sort on a field.
    pub fn asc(field: impl Into<FieldName>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<FieldName>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// A grouping key. Groups are tracked through state, notifications, and
/// persistence; the engine never materializes them into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    /// Field to group by
    pub field: FieldName,
    /// Order of the groups themselves
    pub direction: SortDirection,
}

impl GroupKey {
    /// Create a group key with ascending group order.
    pub fn new(field: impl Into<FieldName>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }
}

/// The full query state.
///
/// Invariants: `take` is greater than zero, and `sort` holds at most one key
/// per field. [`QueryState::validate`] checks the former before a state is
/// accepted; the toggle helpers maintain the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    /// Rows to skip before the visible page
    pub skip: usize,
    /// Rows per page
    pub take: usize,
    /// Sort keys in priority order
    pub sort: Vec<SortKey>,
    /// Structured filters, AND-composed
    pub filter: Vec<FilterPredicate>,
    /// Group keys in nesting order
    pub group: Vec<GroupKey>,
    /// Free-text search term across filterable columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            skip: 0,
            take: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            filter: Vec::new(),
            group: Vec::new(),
            search: None,
        }
    }
}

/// A partial state change. Fields left as `None` keep their previous value
/// when merged over an existing state.
///
/// This is an in-process command type, not a wire type: `search` is doubly
/// optional so an update can clear the term, which plain JSON cannot express.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub sort: Option<Vec<SortKey>>,
    pub filter: Option<Vec<FilterPredicate>>,
    pub group: Option<Vec<GroupKey>>,
    /// `Some(None)` clears the search term; `None` keeps it.
    pub search: Option<Option<String>>,
}

impl QueryState {
    /// Check the state invariants.
    pub fn validate(&self) -> Result<()> {
        if self.take == 0 {
            return Err(Error::InvalidPageSize);
        }
        Ok(())
    }

    /// Merge a partial update over this state, producing the candidate next
    /// state. The candidate is not validated here.
    pub fn merged(&self, update: &StateUpdate) -> QueryState {
        QueryState {
            skip: update.skip.unwrap_or(self.skip),
            take: update.take.unwrap_or(self.take),
            sort: update.sort.clone().unwrap_or_else(|| self.sort.clone()),
            filter: update.filter.clone().unwrap_or_else(|| self.filter.clone()),
            group: update.group.clone().unwrap_or_else(|| self.group.clone()),
            search: update.search.clone().unwrap_or_else(|| self.search.clone()),
        }
    }

    /// Sort keys after toggling a field: none -> asc -> desc -> none.
    ///
    /// In multi mode a new field appends at the end (lowest priority) and the
    /// other keys survive every step of the cycle. In single mode a new
    /// field replaces the whole list, while direction changes on an already
    /// sorted field leave the other keys alone.
    pub fn toggled_sort(&self, field: &str, multi: bool) -> Vec<SortKey> {
        let current = self
            .sort
            .iter()
            .find(|key| key.field == field)
            .map(|key| key.direction);

        match current {
            Some(SortDirection::Asc) => self
                .sort
                .iter()
                .map(|key| {
                    if key.field == field {
                        SortKey::desc(field)
                    } else {
                        key.clone()
                    }
                })
                .collect(),
            Some(SortDirection::Desc) => self
                .sort
                .iter()
                .filter(|key| key.field != field)
                .cloned()
                .collect(),
            None if multi => {
                let mut keys = self.sort.clone();
                keys.push(SortKey::asc(field));
                keys
            }
            None => vec![SortKey::asc(field)],
        }
    }
}
