/// Streak calculation over day-presence sequences
///
/// A streak is computed from an ordered oldest-to-newest list of booleans,
/// one per calendar day. The same scan serves two very different figures:
/// a window-local streak over the last 7 or 30 days, and the authoritative
/// streak over a habit's full history. `StreakScope` travels with every
/// result so the two are never mixed up.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{date_range, DateKey, HabitId};

/// Result of one scan over a presence sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRun {
    /// Run of `true` ending at the last element
    pub current: u32,
    /// Longest run of `true` anywhere in the sequence
    pub longest: u32,
}

/// Which history a streak figure was computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StreakScope {
    /// Only the last `days` days; not a lifetime value
    Windowed { days: u32 },
    /// The habit's full completion history
    Authoritative,
}

/// Calculated streak information for a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakInfo {
    /// Which habit this streak data is for
    pub habit_id: HabitId,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub scope: StreakScope,
    /// Most recent day with a completion in the considered history
    pub last_completion_date: Option<DateKey>,
    /// First day of the current run (None when `current_streak` is 0)
    pub streak_start_date: Option<DateKey>,
}

/// Scan a presence sequence once
pub fn compute_streak<I>(days: I) -> StreakRun
where
    I: IntoIterator<Item = bool>,
{
    let mut run = 0u32;
    let mut longest = 0u32;

    for present in days {
        if present {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    StreakRun {
        current: run,
        longest,
    }
}

impl StreakInfo {
    /// An empty streak record for a habit with no completions
    pub fn empty(habit_id: HabitId, scope: StreakScope) -> Self {
        Self {
            habit_id,
            current_streak: 0,
            longest_streak: 0,
            scope,
            last_completion_date: None,
            streak_start_date: None,
        }
    }

    /// Streak over a fixed display window
    ///
    /// `window` must be the consecutive days being shown (see
    /// `generate_window`); `present` reports whether the habit was completed
    /// on a day.
    pub fn windowed<F>(habit_id: HabitId, window: &[DateKey], present: F) -> Self
    where
        F: Fn(DateKey) -> bool,
    {
        let scope = StreakScope::Windowed {
            days: window.len() as u32,
        };
        let flags: Vec<bool> = window.iter().map(|d| present(*d)).collect();
        let run = compute_streak(flags.iter().copied());

        let last_completion_date = window
            .iter()
            .zip(&flags)
            .rev()
            .find(|(_, p)| **p)
            .map(|(d, _)| *d);

        Self {
            habit_id,
            current_streak: run.current,
            longest_streak: run.longest,
            scope,
            last_completion_date,
            streak_start_date: run_start(window.last().copied(), run.current),
        }
    }

    /// Streak over a habit's full history, up to `anchor`
    ///
    /// `completed` holds every day the habit was completed. Days after
    /// `anchor` are ignored. The sequence starts at the earliest completion,
    /// so nothing before it can affect either figure. It ends at `anchor`
    /// if that day is completed and at the day before otherwise, so a run
    /// through yesterday is still current until today is over.
    pub fn authoritative(habit_id: HabitId, completed: &BTreeSet<DateKey>, anchor: DateKey) -> Self {
        let scope = StreakScope::Authoritative;
        let Some(first) = completed.iter().next().copied().filter(|d| *d <= anchor) else {
            return Self::empty(habit_id, scope);
        };

        let end = if completed.contains(&anchor) {
            anchor
        } else {
            anchor.checked_sub_days(1).unwrap_or(anchor)
        };
        let run = compute_streak(date_range(first, end).into_iter().map(|d| completed.contains(&d)));

        Self {
            habit_id,
            current_streak: run.current,
            longest_streak: run.longest,
            scope,
            last_completion_date: completed.range(..=anchor).next_back().copied(),
            streak_start_date: run_start(Some(end), run.current),
        }
    }
}

fn run_start(last_day: Option<DateKey>, current: u32) -> Option<DateKey> {
    if current == 0 {
        return None;
    }
    last_day.and_then(|d| d.checked_sub_days(u64::from(current - 1)))
}
