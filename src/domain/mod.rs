/// Domain module containing the calendar and streak primitives
///
/// This module defines the canonical day key, the raw completion record
/// shape handed to us by the store, habit summaries, and streak values.
/// Everything above this layer works on `DateKey`s only, never raw strings.

pub mod date_key;
pub mod completion;
pub mod streak;
pub mod types;
pub mod window;

// Re-export public types for easy access
pub use date_key::*;
pub use completion::*;
pub use streak::*;
pub use types::*;
pub use window::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid habit id: {0}")]
    InvalidHabitId(String),

    #[error("Invalid date: {0}")]
    InvalidDate(#[from] ParseError),

    #[error("Unsupported activity window: {0} days (expected 7 or 30)")]
    InvalidWindow(u32),
}
