/// Core identifier and summary types used throughout the domain layer
///
/// These are the values the store hands us about habits. The core never
/// owns habits; it only uses summaries to decide which habits to index.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a habit
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass a habit ID where a completion ID is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a habit ID from its string form
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::InvalidHabitId(s.to_string()))
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a completion record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionId(pub Uuid);

impl CompletionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for CompletionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the habit catalog tells us about a habit
///
/// Only `id` and `is_active` matter to indexing; the rest is carried
/// through for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSummary {
    pub id: HabitId,
    pub name: String,
    /// Display color as a CSS hex string (e.g. "#3B82F6")
    pub color: String,
    pub is_active: bool,
    /// Scheduling label as the catalog reports it ("daily", "weekly", ...)
    pub frequency: String,
}

/// Default color for habits created without one
pub const DEFAULT_HABIT_COLOR: &str = "#3B82F6";

impl HabitSummary {
    /// Create a new active habit summary with validation
    pub fn new(name: String, color: Option<String>, frequency: Option<String>) -> Result<Self, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string(),
            ));
        }

        let color = color.unwrap_or_else(|| DEFAULT_HABIT_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(DomainError::Validation {
                message: format!("Color must look like #RRGGBB, got '{}'", color),
            });
        }

        Ok(Self {
            id: HabitId::new(),
            name: trimmed.to_string(),
            color,
            is_active: true,
            frequency: frequency.unwrap_or_else(|| "daily".to_string()),
        })
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
