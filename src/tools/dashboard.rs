/// Tool for the dashboard summary
///
/// This module implements the dashboard_snapshot MCP tool.

use serde::Serialize;

use crate::analytics::AnalyticsSnapshot;
use crate::service::{ActivityService, ServiceError};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub snapshot: AnalyticsSnapshot,
    pub message: String,
}

pub async fn dashboard_snapshot(service: &ActivityService) -> Result<DashboardResponse, ServiceError> {
    let snapshot = service.get_dashboard_snapshot().await?;

    let mut message = format!(
        "📊 Active habits: {} of {} | This week: {} | This month: {} | Completion rate: {:.1}%",
        snapshot.active_habits,
        snapshot.total_habits,
        snapshot.completions_this_week,
        snapshot.completions_this_month,
        snapshot.overall_completion_rate
    );

    if !snapshot.streaks.is_empty() {
        message.push_str("\n\n🔥 Current streaks");
        for named in &snapshot.streaks {
            message.push_str(&format!(
                "\n   {}: {} days (best {})",
                named.habit_name, named.streak.current_streak, named.streak.longest_streak
            ));
        }
    }

    if snapshot.parse_error_count > 0 {
        message.push_str(&format!(
            "\n\n⚠️ {} completion record(s) had unreadable dates and were skipped",
            snapshot.parse_error_count
        ));
    }

    Ok(DashboardResponse { snapshot, message })
}
