/// Dashboard read model assembled from upstream analytics
///
/// The analytics endpoint is not trusted to return a well-formed object.
/// Every field is read defensively: missing or wrongly typed numbers become
/// 0, missing or wrongly typed lists become empty, and list entries that
/// can't be understood are skipped. Nothing here fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::{windowed_activity, ActivityDay, CompletionIndex};
use crate::domain::{normalize, ActivityWindow, DateKey, HabitId, StreakInfo, StreakScope};

/// An authoritative streak together with the habit's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStreak {
    pub habit_name: String,
    #[serde(flatten)]
    pub streak: StreakInfo,
}

/// Per-habit performance row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStat {
    pub habit_id: HabitId,
    pub habit_name: String,
    pub total_completions: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Percentage, clamped to [0, 100]
    pub completion_rate: f64,
    pub last_completion_date: Option<DateKey>,
}

/// Validated dashboard summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_habits: u64,
    pub active_habits: u64,
    pub total_completions: u64,
    pub completions_this_week: u64,
    pub completions_this_month: u64,
    /// Percentage, clamped to [0, 100]
    pub overall_completion_rate: f64,
    /// Always authoritative-scope streaks
    pub streaks: Vec<NamedStreak>,
    pub habit_stats: Vec<HabitStat>,
    /// Last 7 days of completion events across habits
    pub weekly_activity: Vec<ActivityDay>,
    /// Last 30 days of completion events across habits
    pub monthly_activity: Vec<ActivityDay>,
    /// Records the index dropped for malformed dates
    pub parse_error_count: usize,
}

/// Builds `AnalyticsSnapshot`s for a fixed "today"
pub struct AnalyticsAggregator {
    today: DateKey,
}

impl AnalyticsAggregator {
    pub fn new(today: DateKey) -> Self {
        Self { today }
    }

    /// Combine the upstream analytics object with the local completion index
    ///
    /// Streak figures are taken from upstream as-is (they are computed over
    /// full history there); the chart series come from `index`.
    pub fn build_snapshot(&self, raw: &Value, index: &CompletionIndex) -> AnalyticsSnapshot {
        if !raw.is_object() {
            tracing::warn!("Analytics payload is not an object, using defaults");
        }

        AnalyticsSnapshot {
            total_habits: read_count(raw, "total_habits"),
            active_habits: read_count(raw, "active_habits"),
            total_completions: read_count(raw, "total_completions"),
            completions_this_week: read_count(raw, "completions_this_week"),
            completions_this_month: read_count(raw, "completions_this_month"),
            overall_completion_rate: read_rate(raw, "overall_completion_rate"),
            streaks: read_list(raw, "streaks", parse_streak),
            habit_stats: read_list(raw, "habit_stats", parse_habit_stat),
            weekly_activity: windowed_activity(index, ActivityWindow::Week, self.today, self.today),
            monthly_activity: windowed_activity(index, ActivityWindow::Month, self.today, self.today),
            parse_error_count: index.parse_error_count(),
        }
    }
}

/// A non-negative integer, 0 when absent or not a number
fn count_value(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f.trunc() as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// A percentage in [0, 100], 0 when absent, negative or not finite
fn rate_value(value: Option<&Value>) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(rate) if rate.is_finite() && rate > 0.0 => rate.min(100.0),
        _ => 0.0,
    }
}

fn date_value(value: Option<&Value>) -> Option<DateKey> {
    value.and_then(Value::as_str).and_then(|s| normalize(s).ok())
}

fn read_count(raw: &Value, field: &str) -> u64 {
    count_value(raw.get(field))
}

fn read_rate(raw: &Value, field: &str) -> f64 {
    rate_value(raw.get(field))
}

fn read_list<T>(raw: &Value, field: &str, parse: fn(&Value) -> Option<T>) -> Vec<T> {
    let Some(items) = raw.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let parsed = parse(item);
            if parsed.is_none() {
                tracing::warn!("Skipping unreadable {} entry: {}", field, item);
            }
            parsed
        })
        .collect()
}

fn habit_identity(item: &Value) -> Option<(HabitId, String)> {
    let habit_id = item.get("habit_id").and_then(Value::as_str).and_then(|s| HabitId::parse(s).ok())?;
    let habit_name = item
        .get("habit_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((habit_id, habit_name))
}

fn parse_streak(item: &Value) -> Option<NamedStreak> {
    let (habit_id, habit_name) = habit_identity(item)?;
    Some(NamedStreak {
        habit_name,
        streak: StreakInfo {
            habit_id,
            current_streak: count_value(item.get("current_streak")).min(u64::from(u32::MAX)) as u32,
            longest_streak: count_value(item.get("longest_streak")).min(u64::from(u32::MAX)) as u32,
            scope: StreakScope::Authoritative,
            last_completion_date: date_value(item.get("last_completion_date")),
            streak_start_date: date_value(item.get("streak_start_date")),
        },
    })
}

fn parse_habit_stat(item: &Value) -> Option<HabitStat> {
    let (habit_id, habit_name) = habit_identity(item)?;
    Some(HabitStat {
        habit_id,
        habit_name,
        total_completions: count_value(item.get("total_completions")),
        current_streak: count_value(item.get("current_streak")).min(u64::from(u32::MAX)) as u32,
        longest_streak: count_value(item.get("longest_streak")).min(u64::from(u32::MAX)) as u32,
        completion_rate: rate_value(item.get("completion_rate")),
        last_completion_date: date_value(item.get("last_completion_date")),
    })
}
