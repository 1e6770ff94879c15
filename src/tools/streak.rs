/// Tool for checking a habit's streak
///
/// This module implements the habit_streak MCP tool. The caller picks the
/// mode explicitly; a windowed figure is always labelled as such.

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityWindow, DomainError, HabitId, StreakInfo, StreakScope};
use crate::service::{ActivityService, ServiceError, StreakMode};

/// Parameters for checking a streak
#[derive(Debug, Deserialize)]
pub struct StreakParams {
    pub habit_id: String,
    /// "authoritative" (default) or "windowed"
    pub mode: Option<String>,
    /// Window size for windowed mode, 7 or 30 (defaults to 7)
    pub window: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub streak: StreakInfo,
    pub message: String,
}

fn parse_mode(mode: Option<&str>, window: Option<u32>) -> Result<StreakMode, DomainError> {
    match mode.map(|m| m.trim().to_lowercase()).as_deref() {
        None | Some("authoritative") => Ok(StreakMode::Authoritative),
        Some("windowed") => Ok(StreakMode::Windowed(ActivityWindow::try_from(window.unwrap_or(7))?)),
        Some(other) => Err(DomainError::Validation {
            message: format!("Unknown streak mode '{}' (expected 'windowed' or 'authoritative')", other),
        }),
    }
}

pub async fn habit_streak(service: &ActivityService, params: StreakParams) -> Result<StreakResponse, ServiceError> {
    let habit_id = HabitId::parse(&params.habit_id)?;
    let mode = parse_mode(params.mode.as_deref(), params.window)?;

    let streak = service.get_habit_streak(habit_id, mode).await?;

    let scope = match streak.scope {
        StreakScope::Windowed { days } => format!("last {} days only", days),
        StreakScope::Authoritative => "all time".to_string(),
    };
    let mut message = format!(
        "🔥 Current streak: {} day{} | Best: {} day{} ({})",
        streak.current_streak,
        if streak.current_streak == 1 { "" } else { "s" },
        streak.longest_streak,
        if streak.longest_streak == 1 { "" } else { "s" },
        scope
    );
    if let Some(last) = streak.last_completion_date {
        message.push_str(&format!("\n   Last completed: {}", last));
    }

    Ok(StreakResponse { streak, message })
}
