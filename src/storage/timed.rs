/// Transport timeout adapter
///
/// Wraps any store and bounds every call with `tokio::time::timeout`. An
/// elapsed call becomes `StoreError::Timeout`, which the toggle coordinator
/// treats like any other unreachable-store failure.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CompletionId, CompletionRecord, DateKey, HabitId, HabitSummary};
use crate::storage::{AnalyticsStore, CompletionStore, HabitCatalog, StoreError};

pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Store call exceeded {:?}", self.timeout);
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl<S: CompletionStore> CompletionStore for TimedStore<S> {
    async fn list_completions(
        &self,
        habit_id: HabitId,
        start_date: Option<DateKey>,
        end_date: Option<DateKey>,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        self.bounded(self.inner.list_completions(habit_id, start_date, end_date)).await
    }

    async fn create_completion(&self, habit_id: HabitId, date: DateKey) -> Result<CompletionRecord, StoreError> {
        self.bounded(self.inner.create_completion(habit_id, date)).await
    }

    async fn delete_completion(&self, record_id: CompletionId) -> Result<(), StoreError> {
        self.bounded(self.inner.delete_completion(record_id)).await
    }
}

#[async_trait]
impl<S: AnalyticsStore> AnalyticsStore for TimedStore<S> {
    async fn fetch_analytics(&self) -> Result<Value, StoreError> {
        self.bounded(self.inner.fetch_analytics()).await
    }
}

#[async_trait]
impl<S: HabitCatalog> HabitCatalog for TimedStore<S> {
    async fn list_habits(&self, active_only: bool) -> Result<Vec<HabitSummary>, StoreError> {
        self.bounded(self.inner.list_habits(active_only)).await
    }

    async fn create_habit(&self, habit: &HabitSummary) -> Result<(), StoreError> {
        self.bounded(self.inner.create_habit(habit)).await
    }
}
