/// Calendar-aligned activity series for the charts

use serde::{Deserialize, Serialize};

use crate::analytics::CompletionIndex;
use crate::domain::{generate_window, ActivityWindow, DateKey};

/// One bar of an activity chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDay {
    pub date: DateKey,
    pub count: u32,
    #[serde(rename = "isToday")]
    pub is_today: bool,
}

/// Join the window ending at `anchor` against the index's daily counts
///
/// Days with no completions are present with a count of 0.
pub fn windowed_activity(index: &CompletionIndex, window: ActivityWindow, anchor: DateKey, today: DateKey) -> Vec<ActivityDay> {
    generate_window(anchor, i64::from(window.days()))
        .into_iter()
        .map(|date| ActivityDay {
            date,
            count: index.daily_count(date),
            is_today: date == today,
        })
        .collect()
}
