//! Column definitions.
//!
//! A [`Column`] describes one field of the record set: how it is titled, which
//! pipeline stages may touch it, and how its cell value is produced. Columns
//! are configuration, not data; the engine borrows them read-only.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::AggregateKind;
use crate::{FieldName, Record};

/// Computes a cell value from a record and its index in the current page.
///
/// Overrides plain field lookup for derived cells (e.g. a row number or a
/// value combined from several fields). Shared so column sets stay cheap to
/// clone.
pub type ValueGetter = Arc<dyn Fn(&Record, usize) -> Value + Send + Sync>;

/// Which edge a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pinned {
    Left,
    Right,
}

/// One column of the grid.
#[derive(Clone)]
pub struct Column {
    /// Field name resolved against each record
    pub field: FieldName,
    /// Header title
    pub title: String,
    /// Participates in sorting
    pub sortable: bool,
    /// Participates in filtering and global search
    pub filterable: bool,
    /// Participates in grouping
    pub groupable: bool,
    /// Rendered at all; a rendering concern carried for the layout snapshot
    pub visible: bool,
    /// CSS width, e.g. `"120px"`
    pub width: Option<String>,
    /// Pinned edge
    pub pinned: Option<Pinned>,
    /// Summary shown in the column footer
    pub aggregate: Option<AggregateKind>,
    /// Derived-cell override; `None` means plain field lookup
    pub value_getter: Option<ValueGetter>,
}

impl Column {
    /// New column with every capability enabled.
    pub fn new(field: impl Into<FieldName>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            sortable: true,
            filterable: true,
            groupable: true,
            visible: true,
            width: None,
            pinned: None,
            aggregate: None,
            value_getter: None,
        }
    }

    /// New column titled from its field name: `unitPrice` and `unit_price`
    /// both become `Unit Price`.
    pub fn from_field(field: impl Into<FieldName>) -> Self {
        let field = field.into();
        let title = title_from_field(&field);
        Self::new(field, title)
    }

    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn with_aggregate(mut self, kind: AggregateKind) -> Self {
        self.aggregate = Some(kind);
        self
    }

    pub fn with_value_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&Record, usize) -> Value + Send + Sync + 'static,
    {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    pub fn pinned(mut self, edge: Pinned) -> Self {
        self.pinned = Some(edge);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn not_sortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn not_groupable(mut self) -> Self {
        self.groupable = false;
        self
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("field", &self.field)
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("groupable", &self.groupable)
            .field("visible", &self.visible)
            .field("width", &self.width)
            .field("pinned", &self.pinned)
            .field("aggregate", &self.aggregate)
            .field("value_getter", &self.value_getter.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// Title-case a `camelCase` or `snake_case` field name.
fn title_from_field(field: &str) -> String {
    let mut title = String::with_capacity(field.len() + 4);
    let mut start_of_word = true;

    for ch in field.chars() {
        if ch == '_' || ch == '-' {
            if !title.is_empty() {
                title.push(' ');
            }
            start_of_word = true;
            continue;
        }
        if ch.is_uppercase() && !title.is_empty() && !start_of_word {
            title.push(' ');
        }
        if start_of_word {
            title.extend(ch.to_uppercase());
            start_of_word = false;
        } else {
            title.push(ch);
        }
    }

    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_column_enables_everything() {
        let column = Column::new("name", "Name");
        assert!(column.sortable);
        assert!(column.filterable);
        assert!(column.groupable);
        assert!(column.visible);
        assert!(column.width.is_none());
        assert!(column.pinned.is_none());
        assert!(column.aggregate.is_none());
        assert!(column.value_getter.is_none());
    }

    #[test]
    fn builders_flip_flags() {
        let column = Column::new("id", "ID")
            .hidden()
            .not_sortable()
            .not_filterable()
            .not_groupable()
            .pinned(Pinned::Left)
            .with_width("80px")
            .with_aggregate(AggregateKind::Count);

        assert!(!column.visible);
        assert!(!column.sortable);
        assert!(!column.filterable);
        assert!(!column.groupable);
        assert_eq!(column.pinned, Some(Pinned::Left));
        assert_eq!(column.width.as_deref(), Some("80px"));
        assert_eq!(column.aggregate, Some(AggregateKind::Count));
    }

    #[test]
    fn titles_from_camel_and_snake_case() {
        assert_eq!(Column::from_field("unitPrice").title, "Unit Price");
        assert_eq!(Column::from_field("unit_price").title, "Unit Price");
        assert_eq!(Column::from_field("name").title, "Name");
        assert_eq!(Column::from_field("orderID").title, "Order I D");
    }

    #[test]
    fn value_getter_receives_record_and_index() {
        let column = Column::new("rowNo", "Row No").with_value_getter(|_, index| json!(index + 1));
        let getter = column.value_getter.as_ref().unwrap();

        assert_eq!(getter(&json!({}), 0), json!(1));
        assert_eq!(getter(&json!({}), 4), json!(5));
    }

    #[test]
    fn debug_does_not_print_the_getter() {
        let column = Column::new("a", "A").with_value_getter(|_, _| json!(0));
        let debug = format!("{:?}", column);
        assert!(debug.contains("\"fn\""));
    }

    #[test]
    fn pinned_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Pinned::Right).unwrap(), "\"right\"");
    }
}
