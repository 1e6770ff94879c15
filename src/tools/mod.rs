/// MCP tools over the activity service
///
/// Each tool takes typed parameters, calls one service operation and
/// renders a short text summary alongside the structured result.

pub mod activity;
pub mod dashboard;
pub mod habits;
pub mod streak;
pub mod toggle;

pub use activity::*;
pub use dashboard::*;
pub use habits::*;
pub use streak::*;
pub use toggle::*;

/// Every tool response carries a short text summary for the client
pub trait ToolResponse: serde::Serialize {
    fn message(&self) -> &str;
}

macro_rules! tool_response {
    ($($ty:ty),* $(,)?) => {
        $(impl ToolResponse for $ty {
            fn message(&self) -> &str {
                &self.message
            }
        })*
    };
}

tool_response!(
    ActivityResponse,
    StreakResponse,
    ToggleResponse,
    DashboardResponse,
    CreateHabitResponse,
    ListHabitsResponse,
);
