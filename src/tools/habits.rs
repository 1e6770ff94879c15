/// Tools for creating and listing habits
///
/// Thin pass-throughs to the habit catalog so the bundled server can be
/// used without a separate habit management front end.

use serde::{Deserialize, Serialize};

use crate::domain::HabitSummary;
use crate::service::{ActivityService, ServiceError};

/// Parameters for creating a new habit
#[derive(Debug, Deserialize)]
pub struct CreateHabitParams {
    pub name: String,
    pub color: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub habit: HabitSummary,
    pub message: String,
}

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize)]
pub struct ListHabitsParams {
    pub active_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<HabitSummary>,
    pub message: String,
}

pub async fn create_habit(service: &ActivityService, params: CreateHabitParams) -> Result<CreateHabitResponse, ServiceError> {
    let habit = HabitSummary::new(params.name, params.color, params.frequency)?;
    service.catalog().create_habit(&habit).await?;

    let message = format!("✨ Created habit '{}'\nHabit ID: {}", habit.name, habit.id);
    Ok(CreateHabitResponse { habit, message })
}

pub async fn list_habits(service: &ActivityService, params: ListHabitsParams) -> Result<ListHabitsResponse, ServiceError> {
    let habits = service
        .catalog()
        .list_habits(params.active_only.unwrap_or(true))
        .await?;

    let message = if habits.is_empty() {
        "No habits found. Create your first habit to get started!".to_string()
    } else {
        let lines = habits
            .iter()
            .map(|h| {
                format!(
                    "🎯 {} ({}) | {}{}",
                    h.name,
                    h.id,
                    h.frequency,
                    if h.is_active { "" } else { " ⏸️ (paused)" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("📋 {} habit(s)\n\n{}", habits.len(), lines)
    };

    Ok(ListHabitsResponse { habits, message })
}
