/// Tool for toggling a day's completion
///
/// This module implements the completion_toggle MCP tool.

use serde::{Deserialize, Serialize};

use crate::domain::{normalize, DomainError, HabitId};
use crate::service::{ActivityService, ServiceError};
use crate::toggle::ViewId;

/// Parameters for toggling a completion
#[derive(Debug, Deserialize)]
pub struct ToggleParams {
    pub habit_id: String,
    /// Any date or timestamp encoding; defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub habit_id: HabitId,
    pub date: String,
    pub completed: bool,
    pub message: String,
}

pub async fn toggle_completion(
    service: &ActivityService,
    view: ViewId,
    params: ToggleParams,
) -> Result<ToggleResponse, ServiceError> {
    let habit_id = HabitId::parse(&params.habit_id)?;
    let date = match params.date {
        Some(raw) => normalize(&raw).map_err(DomainError::from)?,
        None => service.today(),
    };

    let completed = service.toggle_completion(view, habit_id, date).await?;

    let message = if completed {
        format!("✅ Marked complete for {}", date)
    } else {
        format!("↩️ Marked not complete for {}", date)
    };

    Ok(ToggleResponse {
        habit_id,
        date: date.to_string(),
        completed,
        message,
    })
}
