/// Day keys, windows and streaks
use std::collections::BTreeSet;

use habit_activity::*;

fn key(s: &str) -> DateKey {
    s.parse().expect("valid test date")
}

#[test]
fn test_normalize_ignores_time_and_offset() {
    let expected = key("2024-06-05");
    for raw in [
        "2024-06-05",
        "2024-06-05T00:00:00Z",
        "2024-06-05T23:59:00-07:00",
        "2024-06-05 08:30:00",
        "2024-6-5",
    ] {
        assert_eq!(normalize(raw).unwrap(), expected, "input {:?}", raw);
    }
}

#[test]
fn test_normalize_is_idempotent() {
    for raw in ["2024-06-05T23:59:00-07:00", "2024-02-29", "1999-12-31T10:00:00.000Z"] {
        let once = normalize(raw).unwrap();
        let twice = normalize(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn test_normalize_rejects_malformed() {
    for raw in ["not-a-date", "", "2024-13-01", "2023-02-29", "06/05/2024", "2024-06-05X"] {
        assert!(normalize(raw).is_err(), "input {:?}", raw);
    }
}

#[test]
fn test_window_ends_at_anchor() {
    let anchor = key("2024-03-02");
    let window = generate_window(anchor, 7);

    assert_eq!(window.len(), 7);
    assert_eq!(*window.last().unwrap(), anchor);
    // Crosses the leap day
    assert!(window.contains(&key("2024-02-29")));
    assert!(window.windows(2).all(|w| w[0].succ() == Some(w[1])));
}

#[test]
fn test_window_is_deterministic() {
    let anchor = key("2024-06-05");
    assert_eq!(generate_window(anchor, 30), generate_window(anchor, 30));
}

#[test]
fn test_non_positive_window_is_empty() {
    assert!(generate_window(key("2024-06-05"), 0).is_empty());
    assert!(generate_window(key("2024-06-05"), -3).is_empty());
}

#[test]
fn test_windowed_streak_over_last_week() {
    let habit = HabitId::new();
    let completed: BTreeSet<DateKey> = ["2024-06-03", "2024-06-04", "2024-06-05"].iter().map(|d| key(d)).collect();
    let window = generate_window(key("2024-06-05"), 7);

    let streak = StreakInfo::windowed(habit, &window, |d| completed.contains(&d));

    assert_eq!(streak.current_streak, 3);
    assert_eq!(streak.longest_streak, 3);
    assert_eq!(streak.scope, StreakScope::Windowed { days: 7 });
    assert_eq!(streak.streak_start_date, Some(key("2024-06-03")));
}

#[test]
fn test_authoritative_streak_sees_past_the_window() {
    let habit = HabitId::new();
    let mut completed: BTreeSet<DateKey> = (1..=20).map(|d| key(&format!("2024-05-{:02}", d))).collect();
    completed.insert(key("2024-06-05"));

    let streak = StreakInfo::authoritative(habit, &completed, key("2024-06-05"));
    assert_eq!(streak.current_streak, 1);
    assert_eq!(streak.longest_streak, 20);

    let window = generate_window(key("2024-06-05"), 7);
    let windowed = StreakInfo::windowed(habit, &window, |d| completed.contains(&d));
    assert_eq!(windowed.longest_streak, 1);
}

#[test]
fn test_authoritative_streak_without_history() {
    let streak = StreakInfo::authoritative(HabitId::new(), &BTreeSet::new(), key("2024-06-05"));
    assert_eq!(streak.current_streak, 0);
    assert_eq!(streak.longest_streak, 0);
    assert!(streak.last_completion_date.is_none());
}

#[test]
fn test_habit_summary_validation() {
    assert!(HabitSummary::new("Read".to_string(), None, None).is_ok());
    assert!(HabitSummary::new("   ".to_string(), None, None).is_err());
    assert!(HabitSummary::new("Read".to_string(), Some("blue".to_string()), None).is_err());

    let habit = HabitSummary::new("Read".to_string(), Some("#10B981".to_string()), None).unwrap();
    assert_eq!(habit.color, "#10B981");
    assert!(habit.is_active);
}

#[test]
fn test_activity_window_sizes() {
    assert_eq!(ActivityWindow::try_from(7).unwrap(), ActivityWindow::Week);
    assert_eq!(ActivityWindow::try_from(30).unwrap().days(), 30);
    assert_eq!(ActivityWindow::try_from(14), Err(DomainError::InvalidWindow(14)));
}
