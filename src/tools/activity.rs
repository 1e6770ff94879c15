/// Tool for the weekly/monthly activity charts
///
/// This module implements the activity_window MCP tool.

use serde::{Deserialize, Serialize};

use crate::analytics::ActivityDay;
use crate::domain::{normalize, ActivityWindow};
use crate::service::{ActivityService, ServiceError};
use crate::toggle::ViewId;

/// Parameters for fetching an activity window
#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    /// 7 or 30, defaults to 7
    pub window: Option<u32>,
    /// Last day of the window (defaults to today)
    pub anchor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub days: Vec<ActivityDay>,
    pub message: String,
}

pub async fn windowed_activity(
    service: &ActivityService,
    view: ViewId,
    params: ActivityParams,
) -> Result<ActivityResponse, ServiceError> {
    let window = ActivityWindow::try_from(params.window.unwrap_or(7))?;
    let anchor = match params.anchor {
        Some(raw) => normalize(&raw).map_err(crate::domain::DomainError::from)?,
        None => service.today(),
    };

    let days = service.get_windowed_activity(view, window, anchor).await?;

    let total: u32 = days.iter().map(|d| d.count).sum();
    let chart = days
        .iter()
        .map(|d| {
            format!(
                "{}{} {}",
                d.date,
                if d.is_today { " (today)" } else { "" },
                "#".repeat(d.count as usize)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let message = format!(
        "📅 {} completions in the {} days ending {}\n\n{}",
        total,
        window.days(),
        anchor,
        chart
    );

    Ok(ActivityResponse { days, message })
}
