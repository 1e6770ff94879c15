/// Completion records as the store reports them
///
/// The `completion_date` is kept exactly as received. It may be a bare date
/// or a full timestamp; `DateKey` normalization happens in the index and the
/// toggle coordinator, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{normalize, CompletionId, DateKey, HabitId, ParseError};

/// Evidence that a habit was performed on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: CompletionId,
    pub habit_id: HabitId,
    /// Raw date encoding from the store
    pub completion_date: String,
    pub created_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn new(id: CompletionId, habit_id: HabitId, completion_date: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            habit_id,
            completion_date: completion_date.into(),
            created_at,
        }
    }

    /// The day this record counts for
    pub fn date_key(&self) -> Result<DateKey, ParseError> {
        normalize(&self.completion_date)
    }

    /// Whether this record is for `habit_id` on `date`; malformed dates never match
    pub fn is_for(&self, habit_id: HabitId, date: DateKey) -> bool {
        self.habit_id == habit_id && self.date_key().map_or(false, |d| d == date)
    }
}
