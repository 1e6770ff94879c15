/// Calendar window generation
///
/// Pure functions producing the day sequences the charts and windowed
/// streaks are drawn over.

use serde::{Deserialize, Serialize};

use crate::domain::{DateKey, DomainError};

/// The two chart windows the presentation layer asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ActivityWindow {
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
}

impl ActivityWindow {
    pub fn days(&self) -> u32 {
        match self {
            ActivityWindow::Week => 7,
            ActivityWindow::Month => 30,
        }
    }
}

impl TryFrom<u32> for ActivityWindow {
    type Error = DomainError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(ActivityWindow::Week),
            30 => Ok(ActivityWindow::Month),
            other => Err(DomainError::InvalidWindow(other)),
        }
    }
}

impl From<ActivityWindow> for u32 {
    fn from(window: ActivityWindow) -> Self {
        window.days()
    }
}

/// `length` consecutive days ending at `anchor`, oldest first
///
/// A non-positive `length` yields an empty sequence. Days that would fall
/// before the earliest representable date are omitted.
pub fn generate_window(anchor: DateKey, length: i64) -> Vec<DateKey> {
    if length <= 0 {
        return Vec::new();
    }

    (0..length as u64)
        .rev()
        .filter_map(|back| anchor.checked_sub_days(back))
        .collect()
}

/// Every day from `start` through `end` inclusive, empty if `start > end`
pub fn date_range(start: DateKey, end: DateKey) -> Vec<DateKey> {
    generate_window(end, end.days_since(start) + 1)
}
