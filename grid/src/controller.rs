//! Grid controller.
//!
//! Owns the query state and turns bursts of edits into single
//! recomputations. Edits are applied to the store as they arrive; execution
//! waits out a quiet window, so ten keystrokes cost one run. Every
//! dispatched run carries a sequence number and supersedes the one before
//! it: the older fetch is aborted, and a response bearing a stale sequence
//! number is discarded instead of overwriting fresher rows.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::OptionFuture;
use serde_json::Value;
use sift_engine::{
    aggregate, pipeline, protocol, Column, FilterOperator, FilterPredicate, GroupKey, QueryResult,
    QueryState, Record, StateUpdate,
};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant};

use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::source::DataSource;
use crate::store::StateStore;
use crate::transport::{HttpTransport, Transport};

/// One published grid computation.
#[derive(Debug, Clone)]
pub struct GridUpdate {
    /// State revision this update reflects
    pub revision: u64,
    /// The settled query state
    pub state: QueryState,
    /// Page and total, always replaced as a pair; after a failed run the
    /// previous pair is retained
    pub result: QueryResult,
    /// Footer values for the displayed page, keyed by field
    pub summary: HashMap<String, f64>,
    /// Failure of the run behind this update, if any
    pub error: Option<GridError>,
}

enum Command {
    Update(StateUpdate),
    ToggleSort(String),
    ApplyFilter(FilterPredicate),
    ClearFilter(String),
    ClearFilters,
    ColumnSearch { field: String, term: String },
    AddGroup(String),
    RemoveGroup(String),
    SetPage(usize),
    SetPageSize(usize),
    SetColumns(Vec<Column>),
    SetSource(DataSource),
    Refresh,
}

/// Debounced, revisioned front door to the query engine.
///
/// Construction spawns a driver task, so a Tokio runtime must be current.
/// Dropping the controller stops the driver.
pub struct GridController {
    commands: mpsc::UnboundedSender<Command>,
    updates: watch::Receiver<GridUpdate>,
    driver: JoinHandle<()>,
}

impl GridController {
    /// Controller over the given source, fetching remotely via HTTP.
    pub fn new(config: GridConfig, source: DataSource) -> Self {
        Self::with_transport(config, source, Arc::new(HttpTransport::new()))
    }

    /// Controller with a caller-chosen transport for remote sources.
    pub fn with_transport(
        config: GridConfig,
        source: DataSource,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let initial = QueryState {
            take: config.page_size,
            ..QueryState::default()
        };
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (publisher, updates) = watch::channel(GridUpdate {
            revision: 0,
            state: initial.clone(),
            result: QueryResult {
                rows: Vec::new(),
                total: 0,
            },
            summary: HashMap::new(),
            error: None,
        });

        let driver = Driver {
            columns: config.columns.clone(),
            config,
            store: StateStore::new(initial),
            column_filters: Vec::new(),
            source,
            transport,
            commands: command_rx,
            publisher,
            seq: 0,
            in_flight: None,
            last_run: None,
        };
        let driver = tokio::spawn(driver.run());

        Self {
            commands,
            updates,
            driver,
        }
    }

    /// Apply a partial state update.
    pub fn update(&self, update: StateUpdate) {
        self.send(Command::Update(update));
    }

    /// Cycle a column's sort: none to ascending to descending to none.
    ///
    /// Respects the `sortable` switches on the config and the column, and
    /// the `multi_sort` option for whether other keys survive.
    pub fn toggle_sort(&self, field: impl Into<String>) {
        self.send(Command::ToggleSort(field.into()));
    }

    /// Set the filter for a field, replacing any existing one on it.
    pub fn apply_filter(&self, predicate: FilterPredicate) {
        self.send(Command::ApplyFilter(predicate));
    }

    /// Remove the filter on a field.
    pub fn clear_filter(&self, field: impl Into<String>) {
        self.send(Command::ClearFilter(field.into()));
    }

    /// Remove every filter, including per-column search terms.
    pub fn clear_filters(&self) {
        self.send(Command::ClearFilters);
    }

    /// Set the global search term.
    pub fn set_search(&self, term: impl Into<String>) {
        self.update(StateUpdate {
            search: Some(Some(term.into())),
            ..StateUpdate::default()
        });
    }

    /// Clear the global search term.
    pub fn clear_search(&self) {
        self.update(StateUpdate {
            search: Some(None),
            ..StateUpdate::default()
        });
    }

    /// Set a per-column search term, kept apart from structured filters.
    /// An empty term clears the column's search.
    pub fn set_column_search(&self, field: impl Into<String>, term: impl Into<String>) {
        self.send(Command::ColumnSearch {
            field: field.into(),
            term: term.into(),
        });
    }

    /// Append a grouping key for a field, if not already grouped.
    pub fn add_group(&self, field: impl Into<String>) {
        self.send(Command::AddGroup(field.into()));
    }

    /// Remove the grouping key for a field.
    pub fn remove_group(&self, field: impl Into<String>) {
        self.send(Command::RemoveGroup(field.into()));
    }

    /// Jump to a zero-based page.
    pub fn set_page(&self, page: usize) {
        self.send(Command::SetPage(page));
    }

    /// Change the page size and return to the first page.
    pub fn set_page_size(&self, size: usize) {
        self.send(Command::SetPageSize(size));
    }

    /// Replace the column set, e.g. after restoring a saved layout.
    pub fn set_columns(&self, columns: Vec<Column>) {
        self.send(Command::SetColumns(columns));
    }

    /// Swap the record source and recompute.
    pub fn set_source(&self, source: DataSource) {
        self.send(Command::SetSource(source));
    }

    /// Recompute with the current state, even if nothing changed.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Receiver for published updates.
    pub fn subscribe(&self) -> watch::Receiver<GridUpdate> {
        self.updates.clone()
    }

    /// The most recently published update.
    pub fn current(&self) -> GridUpdate {
        self.updates.borrow().clone()
    }

    /// The query state behind the most recent update.
    pub fn state(&self) -> QueryState {
        self.updates.borrow().state.clone()
    }

    fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }
}

impl Drop for GridController {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

enum Wake {
    Command(Option<Command>),
    Quiet,
    Fetched(std::result::Result<(u64, Result<QueryResult>), JoinError>),
}

struct Driver {
    config: GridConfig,
    columns: Vec<Column>,
    store: StateStore,
    /// Per-column search terms as contains predicates, concatenated with the
    /// structured filters at execution time but never published in the state
    column_filters: Vec<FilterPredicate>,
    source: DataSource,
    transport: Arc<dyn Transport>,
    commands: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<GridUpdate>,
    /// Sequence number of the latest dispatched run
    seq: u64,
    in_flight: Option<JoinHandle<(u64, Result<QueryResult>)>>,
    /// What the latest run computed over, for no-op suppression
    last_run: Option<(QueryState, Vec<FilterPredicate>)>,
}

impl Driver {
    async fn run(mut self) {
        let debounce = time::sleep(Duration::ZERO);
        tokio::pin!(debounce);
        let mut armed = false;

        // The first computation happens immediately; the quiet window only
        // batches subsequent edits.
        self.settle();

        loop {
            let wake = {
                let fetch: OptionFuture<_> = self.in_flight.as_mut().into();
                tokio::pin!(fetch);
                tokio::select! {
                    maybe = self.commands.recv() => Wake::Command(maybe),
                    _ = debounce.as_mut(), if armed => Wake::Quiet,
                    Some(joined) = fetch.as_mut() => Wake::Fetched(joined),
                }
            };

            match wake {
                Wake::Command(Some(command)) => {
                    if self.handle(command) {
                        debounce
                            .as_mut()
                            .reset(Instant::now() + Duration::from_millis(self.config.debounce_ms));
                        armed = true;
                    }
                }
                Wake::Command(None) => break,
                Wake::Quiet => {
                    armed = false;
                    self.settle();
                }
                Wake::Fetched(joined) => {
                    self.in_flight = None;
                    self.finish(joined);
                }
            }
        }
    }

    /// Returns whether the command warrants a (debounced) recomputation.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Update(update) => self.stage(update),
            Command::ToggleSort(field) => {
                let allowed =
                    self.config.sortable && self.column(&field).map_or(true, |c| c.sortable);
                if !allowed {
                    tracing::debug!(field = %field, "Sort toggle ignored");
                    return false;
                }
                let sort = self
                    .store
                    .state()
                    .toggled_sort(&field, self.config.multi_sort);
                self.stage(StateUpdate {
                    sort: Some(sort),
                    ..StateUpdate::default()
                })
            }
            Command::ApplyFilter(predicate) => {
                if !self.config.filterable {
                    tracing::debug!(field = %predicate.field, "Filter ignored");
                    return false;
                }
                let mut filter: Vec<FilterPredicate> = self
                    .store
                    .state()
                    .filter
                    .iter()
                    .filter(|p| p.field != predicate.field)
                    .cloned()
                    .collect();
                filter.push(predicate);
                self.stage(StateUpdate {
                    filter: Some(filter),
                    ..StateUpdate::default()
                })
            }
            Command::ClearFilter(field) => {
                let filter: Vec<FilterPredicate> = self
                    .store
                    .state()
                    .filter
                    .iter()
                    .filter(|p| p.field != field)
                    .cloned()
                    .collect();
                self.stage(StateUpdate {
                    filter: Some(filter),
                    ..StateUpdate::default()
                })
            }
            Command::ClearFilters => {
                self.column_filters.clear();
                self.stage(StateUpdate {
                    filter: Some(Vec::new()),
                    ..StateUpdate::default()
                });
                true
            }
            Command::ColumnSearch { field, term } => {
                let allowed =
                    self.config.filterable && self.column(&field).map_or(true, |c| c.filterable);
                if !allowed {
                    tracing::debug!(field = %field, "Column search ignored");
                    return false;
                }
                self.column_filters.retain(|p| p.field != field);
                let term = term.trim();
                if !term.is_empty() {
                    self.column_filters.push(FilterPredicate::new(
                        field,
                        FilterOperator::Contains,
                        Value::String(term.to_string()),
                    ));
                }
                true
            }
            Command::AddGroup(field) => {
                let allowed =
                    self.config.groupable && self.column(&field).map_or(true, |c| c.groupable);
                if !allowed {
                    tracing::debug!(field = %field, "Grouping ignored");
                    return false;
                }
                let mut group = self.store.state().group.clone();
                if group.iter().any(|g| g.field == field) {
                    return false;
                }
                group.push(GroupKey::new(field));
                self.stage(StateUpdate {
                    group: Some(group),
                    ..StateUpdate::default()
                })
            }
            Command::RemoveGroup(field) => {
                let mut group = self.store.state().group.clone();
                group.retain(|g| g.field != field);
                self.stage(StateUpdate {
                    group: Some(group),
                    ..StateUpdate::default()
                })
            }
            Command::SetPage(page) => {
                if !self.config.pageable {
                    tracing::debug!(page, "Page change ignored, paging is disabled");
                    return false;
                }
                let take = self.store.state().take;
                self.stage(StateUpdate {
                    skip: Some(page.saturating_mul(take)),
                    ..StateUpdate::default()
                })
            }
            Command::SetPageSize(size) => self.stage(StateUpdate {
                skip: Some(0),
                take: Some(size),
                ..StateUpdate::default()
            }),
            Command::SetColumns(columns) => {
                self.columns = columns;
                self.last_run = None;
                true
            }
            Command::SetSource(source) => {
                self.source = source;
                self.last_run = None;
                true
            }
            Command::Refresh => {
                self.last_run = None;
                true
            }
        }
    }

    /// Apply an update to the store; a rejected one surfaces immediately.
    fn stage(&mut self, update: StateUpdate) -> bool {
        match self.store.apply(&update) {
            Ok(changed) => changed,
            Err(error) => {
                tracing::warn!(error = %error, "Rejected state update");
                self.publish_error(error);
                false
            }
        }
    }

    /// Run now unless nothing changed since the previous run.
    fn settle(&mut self) {
        let snapshot = (self.store.state().clone(), self.column_filters.clone());
        if self.last_run.as_ref() == Some(&snapshot) {
            tracing::debug!("State unchanged since last run, skipping");
            return;
        }
        self.last_run = Some(snapshot);
        self.dispatch();
    }

    fn dispatch(&mut self) {
        let state = self.effective_state();
        self.seq += 1;

        match &self.source {
            DataSource::Local(records) => {
                let outcome = if self.config.pageable {
                    pipeline::execute(&state, records, &self.columns)
                } else {
                    pipeline::execute_unpaged(&state, records, &self.columns)
                };
                match outcome {
                    Ok(result) => self.publish_result(result),
                    Err(error) => self.publish_error(error.into()),
                }
            }
            DataSource::Remote(remote) => {
                let remote = remote.clone();
                self.abort_in_flight();
                let request = protocol::build_request(&state, &remote.params);
                let transport = Arc::clone(&self.transport);
                let endpoint = remote.endpoint;
                let seq = self.seq;
                tracing::debug!(
                    seq,
                    endpoint = %endpoint,
                    version = ?remote.version,
                    "Dispatching remote query"
                );
                self.in_flight = Some(tokio::spawn(async move {
                    let outcome = match transport.fetch(&endpoint, &request).await {
                        Ok(body) => protocol::parse_response(&body).map_err(GridError::from),
                        Err(error) => Err(error),
                    };
                    (seq, outcome)
                }));
            }
            DataSource::Provider(provider) => {
                let provider = Arc::clone(provider);
                self.abort_in_flight();
                let seq = self.seq;
                tracing::debug!(seq, "Dispatching to provider");
                self.in_flight = Some(tokio::spawn(async move {
                    let outcome = provider.fetch(&state).await;
                    (seq, outcome)
                }));
            }
        }
    }

    fn finish(&mut self, joined: std::result::Result<(u64, Result<QueryResult>), JoinError>) {
        match joined {
            Ok((seq, outcome)) if seq == self.seq => match outcome {
                Ok(result) => self.publish_result(result),
                Err(error) => self.publish_error(error),
            },
            Ok((seq, _)) => {
                tracing::debug!(seq, latest = self.seq, "Discarding stale response");
            }
            Err(join_error) if join_error.is_cancelled() => {}
            Err(join_error) => {
                self.publish_error(GridError::Transport(format!(
                    "fetch task failed: {join_error}"
                )));
            }
        }
    }

    fn publish_result(&mut self, result: QueryResult) {
        let summary = self.summarize(&result.rows);
        tracing::info!(
            revision = self.store.revision(),
            rows = result.rows.len(),
            total = result.total,
            "Publishing grid update"
        );
        let _ = self.publisher.send(GridUpdate {
            revision: self.store.revision(),
            state: self.store.state().clone(),
            result,
            summary,
            error: None,
        });
    }

    fn publish_error(&mut self, error: GridError) {
        tracing::warn!(error = %error, "Grid run failed, keeping previous rows");
        let (result, summary) = {
            let current = self.publisher.borrow();
            (current.result.clone(), current.summary.clone())
        };
        let _ = self.publisher.send(GridUpdate {
            revision: self.store.revision(),
            state: self.store.state().clone(),
            result,
            summary,
            error: Some(error),
        });
    }

    /// Published state plus the per-column search predicates.
    fn effective_state(&self) -> QueryState {
        let mut state = self.store.state().clone();
        if !self.column_filters.is_empty() {
            state.filter.extend(self.column_filters.iter().cloned());
        }
        state
    }

    fn summarize(&self, rows: &[Record]) -> HashMap<String, f64> {
        if !self.config.show_summary {
            return HashMap::new();
        }
        let mut summary = HashMap::new();
        for column in &self.columns {
            if let Some(custom) = self.config.custom_aggregates.get(&column.field) {
                summary.insert(column.field.clone(), custom(rows));
            } else if let Some(kind) = column.aggregate {
                summary.insert(
                    column.field.clone(),
                    aggregate::aggregate(rows, column, kind),
                );
            }
        }
        summary
    }

    fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
