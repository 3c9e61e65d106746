//! Grid configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sift_engine::{Column, Record, DEFAULT_PAGE_SIZE};

/// Caller-supplied reducer for one column's footer, fed the displayed page.
///
/// Takes precedence over the column's built-in aggregate kind.
pub type CustomAggregate = Arc<dyn Fn(&[Record]) -> f64 + Send + Sync>;

/// Options recognized by the grid controller.
///
/// Fields with a behavior note are read by the controller itself;
/// `selectable`, `multi_select`, `exportable`, `resizable` and `reorderable`
/// are conventions for the renderer and pass through untouched.
#[derive(Clone)]
pub struct GridConfig {
    /// Column set the pipeline and summaries operate on
    pub columns: Vec<Column>,
    /// Slice results into pages; when off, every matching row is returned
    pub pageable: bool,
    /// Rows per page
    pub page_size: usize,
    /// Page sizes offered by the renderer
    pub page_sizes: Vec<usize>,
    /// Allow sorting at all
    pub sortable: bool,
    /// Header toggles append sort keys instead of replacing them
    pub multi_sort: bool,
    /// Allow filtering and per-column search
    pub filterable: bool,
    /// Allow grouping
    pub groupable: bool,
    pub selectable: bool,
    pub multi_select: bool,
    pub exportable: bool,
    pub resizable: bool,
    pub reorderable: bool,
    /// Compute per-page column summaries after each run
    pub show_summary: bool,
    /// Quiet window before a burst of state edits triggers one run
    pub debounce_ms: u64,
    /// Footer reducers keyed by field, overriding column aggregates
    pub custom_aggregates: HashMap<String, CustomAggregate>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            pageable: true,
            page_size: DEFAULT_PAGE_SIZE,
            page_sizes: vec![10, 25, 50, 100],
            sortable: true,
            multi_sort: false,
            filterable: true,
            groupable: true,
            selectable: false,
            multi_select: false,
            exportable: true,
            resizable: true,
            reorderable: true,
            show_summary: true,
            debounce_ms: 300,
            custom_aggregates: HashMap::new(),
        }
    }
}

impl fmt::Debug for GridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConfig")
            .field("columns", &self.columns)
            .field("pageable", &self.pageable)
            .field("page_size", &self.page_size)
            .field("page_sizes", &self.page_sizes)
            .field("sortable", &self.sortable)
            .field("multi_sort", &self.multi_sort)
            .field("filterable", &self.filterable)
            .field("groupable", &self.groupable)
            .field("selectable", &self.selectable)
            .field("multi_select", &self.multi_select)
            .field("exportable", &self.exportable)
            .field("resizable", &self.resizable)
            .field("reorderable", &self.reorderable)
            .field("show_summary", &self.show_summary)
            .field("debounce_ms", &self.debounce_ms)
            .field(
                "custom_aggregates",
                &self.custom_aggregates.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl GridConfig {
    /// Default options over the given columns.
    pub fn with_columns(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }
}
