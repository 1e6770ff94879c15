/// Per-(habit, day) toggle state and the tokens guarding it

use serde::Serialize;
use thiserror::Error;

use crate::domain::{CompletionId, DateKey, HabitId};
use crate::storage::StoreError;

/// Identifies one toggleable cell: a habit on a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ToggleKey {
    pub habit_id: HabitId,
    pub date: DateKey,
}

impl ToggleKey {
    pub fn new(habit_id: HabitId, date: DateKey) -> Self {
        Self { habit_id, date }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TogglePhase {
    /// No store mutation in flight; `completed` is the last known truth
    Idle,
    /// A store mutation is in flight for this key
    Pending,
}

/// What the coordinator knows about one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleState {
    pub habit_id: HabitId,
    pub date: DateKey,
    pub phase: TogglePhase,
    pub completed: bool,
    /// Backing record when completed and known
    pub record_id: Option<CompletionId>,
    /// False until the store has been consulted for this key
    pub known: bool,
    /// Coordinator clock value of the last update
    pub generation: u64,
}

impl ToggleState {
    pub(crate) fn unknown(key: ToggleKey) -> Self {
        Self {
            habit_id: key.habit_id,
            date: key.date,
            phase: TogglePhase::Idle,
            completed: false,
            record_id: None,
            known: false,
            generation: 0,
        }
    }

    pub fn key(&self) -> ToggleKey {
        ToggleKey::new(self.habit_id, self.date)
    }
}

/// One presentation-layer view instance (a mounted page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ViewId(pub(crate) u64);

/// Issued before a store read; results are applied only if still current
///
/// A token goes stale for a key once anything updates that key after the
/// token was issued, and for every key once its view is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub view: ViewId,
    pub(crate) issued_at: u64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToggleError {
    /// The store could not be reached; local state was left unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The requesting view was closed before the result arrived
    #[error("view {0:?} is no longer active")]
    Stale(ViewId),
}
