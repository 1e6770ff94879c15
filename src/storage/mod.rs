/// Store collaborators for completions, analytics and the habit catalog
///
/// The core never performs persistence itself. It talks to the outside world
/// only through the async traits defined here. `SqliteStore` is the bundled
/// implementation the binary runs against; tests substitute their own.

pub mod sqlite;
pub mod migrations;
pub mod timed;

// Re-export the main storage types
pub use sqlite::*;
pub use timed::*;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{CompletionId, CompletionRecord, DateKey, HabitId, HabitSummary};

/// Errors reported by the store collaborators
///
/// `DuplicateCompletion` and `NotFound` describe a state change made by
/// another actor and are reconciled by the caller. `Transport` and
/// `Timeout` mean the store could not be reached and are surfaced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Duplicate completion: habit {habit_id} already completed on {date}")]
    DuplicateCompletion { habit_id: HabitId, date: DateKey },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Store unreachable: {0}")]
    Transport(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether this error means the store could not be reached
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Timeout(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Transport(format!("database query failed: {}", e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Transport(format!("serialization failed: {}", e))
    }
}

/// Completion records, keyed by habit and day
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Completions for a habit, optionally bounded by an inclusive date range
    async fn list_completions(
        &self,
        habit_id: HabitId,
        start_date: Option<DateKey>,
        end_date: Option<DateKey>,
    ) -> Result<Vec<CompletionRecord>, StoreError>;

    /// Record a completion; `DuplicateCompletion` if one already exists that day
    async fn create_completion(&self, habit_id: HabitId, date: DateKey) -> Result<CompletionRecord, StoreError>;

    /// Remove a completion; `NotFound` if it is already gone
    async fn delete_completion(&self, record_id: CompletionId) -> Result<(), StoreError>;
}

/// Precomputed analytics, returned in whatever shape the upstream produces
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn fetch_analytics(&self) -> Result<Value, StoreError>;
}

/// The set of habits a user has
#[async_trait]
pub trait HabitCatalog: Send + Sync {
    async fn list_habits(&self, active_only: bool) -> Result<Vec<HabitSummary>, StoreError>;

    async fn create_habit(&self, habit: &HabitSummary) -> Result<(), StoreError>;
}
