//! Grid state store.
//!
//! Holds the single authoritative [`QueryState`]. Every change goes through
//! [`StateStore::apply`], which validates the candidate before accepting it
//! and reports whether anything structurally changed, so callers can skip
//! redundant recomputation.

use sift_engine::{QueryState, StateUpdate};

use crate::error::Result;

/// Revisioned holder of the current query state.
#[derive(Debug, Clone)]
pub struct StateStore {
    state: QueryState,
    revision: u64,
}

impl StateStore {
    pub fn new(initial: QueryState) -> Self {
        Self {
            state: initial,
            revision: 0,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Bumps on every accepted structural change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Merge a partial update into the current state.
    ///
    /// Returns `Ok(true)` when the state changed, `Ok(false)` when the merged
    /// state is structurally identical. An invalid candidate leaves the
    /// current state and revision untouched.
    pub fn apply(&mut self, update: &StateUpdate) -> Result<bool> {
        self.accept(self.state.merged(update))
    }

    /// Replace the state wholesale, with the same validation and
    /// no-change reporting as [`StateStore::apply`].
    pub fn replace(&mut self, next: QueryState) -> Result<bool> {
        self.accept(next)
    }

    fn accept(&mut self, next: QueryState) -> Result<bool> {
        next.validate()?;
        if next == self.state {
            return Ok(false);
        }
        self.state = next;
        self.revision += 1;
        Ok(true)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(QueryState::default())
    }
}
