/// The operations exposed to the presentation layer
///
/// `ActivityService` composes the store collaborators with the index,
/// streak calculator, toggle coordinator and snapshot aggregator. It holds
/// no data of its own beyond the coordinator's toggle state; every read goes
/// back to the store and rebuilds what it needs.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::analytics::{windowed_activity, ActivityDay, AnalyticsAggregator, AnalyticsSnapshot, CompletionIndex};
use crate::domain::{generate_window, ActivityWindow, DateKey, DomainError, HabitId, HabitSummary, StreakInfo};
use crate::storage::{AnalyticsStore, CompletionStore, HabitCatalog, StoreError};
use crate::toggle::{ToggleCoordinator, ToggleError, ViewId};

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Toggle(#[from] ToggleError),

    #[error("Habit not found: {0}")]
    HabitNotFound(HabitId),
}

/// Runtime settings for the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Pinned calendar date; `None` follows the local clock
    pub today: Option<DateKey>,
    /// Bound applied to each store call by `TimedStore`
    pub store_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            today: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn today(&self) -> DateKey {
        self.today.unwrap_or_else(DateKey::today)
    }
}

/// Which history a streak request should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakMode {
    /// The last 7 or 30 days ending today
    Windowed(ActivityWindow),
    /// Full history ending today
    Authoritative,
}

pub struct ActivityService {
    completions: Arc<dyn CompletionStore>,
    analytics: Arc<dyn AnalyticsStore>,
    catalog: Arc<dyn HabitCatalog>,
    coordinator: ToggleCoordinator,
    config: ServiceConfig,
}

impl ActivityService {
    pub fn new(
        completions: Arc<dyn CompletionStore>,
        analytics: Arc<dyn AnalyticsStore>,
        catalog: Arc<dyn HabitCatalog>,
        config: ServiceConfig,
    ) -> Self {
        let coordinator = ToggleCoordinator::new(Arc::clone(&completions));
        Self {
            completions,
            analytics,
            catalog,
            coordinator,
            config,
        }
    }

    /// Build a service over one store that plays every collaborator role
    pub fn from_store<S>(store: S, config: ServiceConfig) -> Self
    where
        S: CompletionStore + AnalyticsStore + HabitCatalog + 'static,
    {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn coordinator(&self) -> &ToggleCoordinator {
        &self.coordinator
    }

    pub fn catalog(&self) -> &dyn HabitCatalog {
        self.catalog.as_ref()
    }

    pub fn today(&self) -> DateKey {
        self.config.today()
    }

    pub fn open_view(&self) -> ViewId {
        self.coordinator.open_view()
    }

    pub fn close_view(&self, view: ViewId) {
        self.coordinator.close_view(view)
    }

    /// Completion events per day over the window ending at `anchor`
    ///
    /// Also refreshes the coordinator's view of every (habit, day) in the
    /// window, unless a toggle overtook the read.
    pub async fn get_windowed_activity(
        &self,
        view: ViewId,
        window: ActivityWindow,
        anchor: DateKey,
    ) -> Result<Vec<ActivityDay>, ServiceError> {
        let days = generate_window(anchor, i64::from(window.days()));
        let token = self.coordinator.begin_read(view);

        let habits = self.catalog.list_habits(true).await?;
        let index = self.index_range(&habits, days.first().copied(), Some(anchor)).await?;

        let applied = self
            .coordinator
            .observe_index(&token, &index, habits.iter().map(|h| h.id), &days);
        tracing::debug!("Window refresh applied {} of {} toggle keys", applied, habits.len() * days.len());

        Ok(windowed_activity(&index, window, anchor, self.today()))
    }

    /// Current and longest streak for one habit in the requested mode
    pub async fn get_habit_streak(&self, habit_id: HabitId, mode: StreakMode) -> Result<StreakInfo, ServiceError> {
        let habits = self.catalog.list_habits(false).await?;
        let habit = habits
            .into_iter()
            .find(|h| h.id == habit_id)
            .ok_or(ServiceError::HabitNotFound(habit_id))?;
        let today = self.today();

        let streak = match mode {
            StreakMode::Windowed(window) => {
                let days = generate_window(today, i64::from(window.days()));
                let index = self.index_range(&[habit], days.first().copied(), Some(today)).await?;
                StreakInfo::windowed(habit_id, &days, |d| index.is_present(habit_id, d))
            }
            StreakMode::Authoritative => {
                let index = self.index_range(&[habit], None, Some(today)).await?;
                StreakInfo::authoritative(habit_id, &index.completed_days(habit_id), today)
            }
        };

        Ok(streak)
    }

    /// Flip one day's completion; resolves to the final completed state
    pub async fn toggle_completion(&self, view: ViewId, habit_id: HabitId, date: DateKey) -> Result<bool, ToggleError> {
        self.coordinator.toggle(view, habit_id, date).await
    }

    /// Dashboard summary: upstream analytics plus locally indexed charts
    pub async fn get_dashboard_snapshot(&self) -> Result<AnalyticsSnapshot, ServiceError> {
        let today = self.today();
        let raw = self.analytics.fetch_analytics().await?;

        let habits = self.catalog.list_habits(true).await?;
        let start = generate_window(today, i64::from(ActivityWindow::Month.days())).first().copied();
        let index = self.index_range(&habits, start, Some(today)).await?;

        Ok(AnalyticsAggregator::new(today).build_snapshot(&raw, &index))
    }

    async fn index_range(
        &self,
        habits: &[HabitSummary],
        start: Option<DateKey>,
        end: Option<DateKey>,
    ) -> Result<CompletionIndex, StoreError> {
        let mut records = Vec::new();
        for habit in habits {
            records.extend(self.completions.list_completions(habit.id, start, end).await?);
        }
        Ok(CompletionIndex::build(&records, habits))
    }
}
