/// Completion index built from raw store records
///
/// Two deliberately separate views come out of one pass:
/// - `global_daily_counts`: raw completion events per day across every
///   habit in scope. This is the volume series the charts draw, so a
///   duplicate record the store should never have returned still counts.
/// - per-habit day presence: a boolean per (habit, day). Duplicates only
///   confirm presence. This drives streaks and toggle state.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::domain::{CompletionId, CompletionRecord, DateKey, HabitId, HabitSummary};

#[derive(Debug, Clone, Default)]
pub struct CompletionIndex {
    global_daily_counts: BTreeMap<DateKey, u32>,
    /// Day -> id of the first record seen for that day
    presence: HashMap<HabitId, BTreeMap<DateKey, CompletionId>>,
    parse_error_count: usize,
    out_of_scope_count: usize,
}

impl CompletionIndex {
    /// Index `records` for the habits in `habit_scope`
    ///
    /// Records with a malformed date are dropped and counted; they never
    /// abort the build. Records for habits outside the scope are ignored.
    pub fn build(records: &[CompletionRecord], habit_scope: &[HabitSummary]) -> Self {
        let scope: HashSet<HabitId> = habit_scope.iter().map(|h| h.id).collect();
        let mut index = Self::default();

        for record in records {
            if !scope.contains(&record.habit_id) {
                index.out_of_scope_count += 1;
                continue;
            }

            let date = match record.date_key() {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!("Dropping completion {} for habit {}: {}", record.id, record.habit_id, e);
                    index.parse_error_count += 1;
                    continue;
                }
            };

            *index.global_daily_counts.entry(date).or_insert(0) += 1;
            index
                .presence
                .entry(record.habit_id)
                .or_default()
                .entry(date)
                .or_insert(record.id);
        }

        tracing::debug!(
            "Indexed {} days across {} habits ({} malformed, {} out of scope)",
            index.global_daily_counts.len(),
            index.presence.len(),
            index.parse_error_count,
            index.out_of_scope_count
        );

        index
    }

    /// Completion events on `date` across all habits in scope
    pub fn daily_count(&self, date: DateKey) -> u32 {
        self.global_daily_counts.get(&date).copied().unwrap_or(0)
    }

    pub fn global_daily_counts(&self) -> &BTreeMap<DateKey, u32> {
        &self.global_daily_counts
    }

    /// Whether `habit_id` was completed on `date`
    pub fn is_present(&self, habit_id: HabitId, date: DateKey) -> bool {
        self.record_id(habit_id, date).is_some()
    }

    /// Id of the record backing a (habit, day) presence
    pub fn record_id(&self, habit_id: HabitId, date: DateKey) -> Option<CompletionId> {
        self.presence.get(&habit_id).and_then(|days| days.get(&date)).copied()
    }

    /// Every day `habit_id` was completed
    pub fn completed_days(&self, habit_id: HabitId) -> BTreeSet<DateKey> {
        self.presence
            .get(&habit_id)
            .map(|days| days.keys().copied().collect())
            .unwrap_or_default()
    }

    /// (habit, day, record) for every present pair
    pub fn presence_entries(&self) -> impl Iterator<Item = (HabitId, DateKey, CompletionId)> + '_ {
        self.presence
            .iter()
            .flat_map(|(habit, days)| days.iter().map(move |(date, id)| (*habit, *date, *id)))
    }

    pub fn parse_error_count(&self) -> usize {
        self.parse_error_count
    }

    pub fn out_of_scope_count(&self) -> usize {
        self.out_of_scope_count
    }
}
