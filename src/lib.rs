/// Public library interface for the habit activity server
///
/// The core of this crate turns sparse completion records into
/// calendar-aligned activity, computes streaks, and toggles a day's
/// completion safely under repeated or concurrent use. The server wiring
/// below runs that core against the bundled SQLite store and exposes it
/// over MCP (JSON-RPC on stdin/stdout).

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

// Internal modules
pub mod analytics;
pub mod domain;
pub mod service;
pub mod storage;
pub mod toggle;
mod tools;
mod mcp;

// Re-export public modules and types
pub use analytics::{windowed_activity, ActivityDay, AnalyticsAggregator, AnalyticsSnapshot, CompletionIndex, HabitStat, NamedStreak};
pub use domain::*;
pub use service::{ActivityService, ServiceConfig, ServiceError, StreakMode};
pub use storage::{AnalyticsStore, CompletionStore, HabitCatalog, SqliteStore, StoreError, TimedStore};
pub use toggle::{ToggleCoordinator, ToggleError, TogglePhase, ToggleState, ViewId};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Habit activity server backed by a SQLite database
pub struct HabitActivityServer {
    service: Arc<ActivityService>,
}

impl HabitActivityServer {
    /// Open the database at `db_path` and wire the service over it
    ///
    /// This will initialize the SQLite schema if it doesn't already exist.
    pub async fn new(db_path: PathBuf, config: ServiceConfig) -> Result<Self, ServerError> {
        tracing::info!("Initializing habit activity server with database: {:?}", db_path);

        let mut store = SqliteStore::new(db_path)?;
        if let Some(today) = config.today {
            store = store.with_today(today);
        }

        Ok(Self::with_store(store, config))
    }

    /// Wire the service over an already-open SQLite store
    pub fn with_store(store: SqliteStore, config: ServiceConfig) -> Self {
        let store = TimedStore::new(store, config.store_timeout);
        Self {
            service: Arc::new(ActivityService::from_store(store, config)),
        }
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// This method will block until stdin closes or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        let habits = self.service.catalog().list_habits(true).await?;
        tracing::info!("Server started successfully, found {} active habits", habits.len());

        let mut mcp_server = mcp::McpServer::new(Arc::clone(&self.service));
        mcp_server.run().await?;

        Ok(())
    }

    /// The service the tools run against (useful for testing)
    pub fn service(&self) -> &ActivityService {
        &self.service
    }
}
