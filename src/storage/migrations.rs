/// Database migration management
///
/// This module handles creating and updating the SQLite database schema
/// backing the bundled completion store.

use rusqlite::Connection;
use crate::storage::StoreError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// This creates all required tables and indexes if they don't exist.
pub fn initialize_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )
    .map_err(migration_error)?;

    let current_version = get_current_version(conn);

    if current_version < CURRENT_VERSION {
        run_migrations(conn, current_version)?;
        set_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Get the current database schema version, 0 for a fresh database
fn get_current_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute("DELETE FROM schema_version", []).map_err(migration_error)?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(migration_error)?;
    Ok(())
}

fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: habits and their completions
fn migration_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            frequency TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            id TEXT PRIMARY KEY,
            habit_id TEXT NOT NULL,
            completion_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (habit_id) REFERENCES habits (id)
        );

        CREATE INDEX IF NOT EXISTS idx_habits_active
            ON habits (is_active);

        CREATE INDEX IF NOT EXISTS idx_habit_completions_date
            ON habit_completions (completion_date);

        -- At most one completion per habit per day
        CREATE UNIQUE INDEX IF NOT EXISTS idx_habit_completions_unique
            ON habit_completions (habit_id, completion_date);",
    )
    .map_err(migration_error)?;

    tracing::info!("Applied migration v1: created habits and habit_completions");
    Ok(())
}

fn migration_error(e: rusqlite::Error) -> StoreError {
    StoreError::Migration(e.to_string())
}
