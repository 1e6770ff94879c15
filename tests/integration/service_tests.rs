/// End-to-end service behavior over the SQLite store and the store double
use serde_json::json;
use tempfile::NamedTempFile;

use habit_activity::*;

use crate::support::{key, FakeStore};

const TODAY: &str = "2024-06-05";

fn config() -> ServiceConfig {
    ServiceConfig {
        today: Some(key(TODAY)),
        ..ServiceConfig::default()
    }
}

fn sqlite_server(file: &NamedTempFile) -> HabitActivityServer {
    let store = SqliteStore::new(file.path().to_path_buf())
        .expect("Failed to create store")
        .with_today(key(TODAY));
    HabitActivityServer::with_store(store, config())
}

async fn add_habit(service: &ActivityService, name: &str) -> HabitId {
    let habit = HabitSummary::new(name.to_string(), None, None).expect("valid habit");
    service.catalog().create_habit(&habit).await.expect("Failed to create habit");
    habit.id
}

async fn complete(service: &ActivityService, view: ViewId, habit: HabitId, days: &[&str]) {
    for day in days {
        assert_eq!(service.toggle_completion(view, habit, key(day)).await, Ok(true));
    }
}

#[tokio::test]
async fn test_weekly_activity_counts_per_day() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();

    let read = add_habit(service, "Read").await;
    let walk = add_habit(service, "Walk").await;
    complete(service, view, read, &["2024-06-05", "2024-06-04", "2024-05-30"]).await;
    complete(service, view, walk, &["2024-06-05", "2024-05-20"]).await;

    let days = service
        .get_windowed_activity(view, ActivityWindow::Week, key(TODAY))
        .await
        .unwrap();

    assert_eq!(days.len(), 7);
    assert_eq!(days[0].date, key("2024-05-30"));
    assert_eq!(days[6].date, key(TODAY));
    assert!(days[6].is_today);
    assert!(days[..6].iter().all(|d| !d.is_today));

    let counts: Vec<u32> = days.iter().map(|d| d.count).collect();
    assert_eq!(counts, vec![1, 0, 0, 0, 0, 1, 2]);
}

#[tokio::test]
async fn test_monthly_window_is_thirty_days() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();

    let read = add_habit(service, "Read").await;
    complete(service, view, read, &["2024-05-07", "2024-05-06"]).await;

    let days = service
        .get_windowed_activity(view, ActivityWindow::Month, key(TODAY))
        .await
        .unwrap();

    assert_eq!(days.len(), 30);
    assert_eq!(days[0].date, key("2024-05-07"));
    assert_eq!(days[0].count, 1);
    assert_eq!(days.iter().map(|d| d.count).sum::<u32>(), 1);
}

#[tokio::test]
async fn test_window_refresh_updates_toggle_state() {
    let (store, habit) = FakeStore::with_habit("Read");
    let service = ActivityService::new(store.clone(), store.clone(), store.clone(), config());
    let view = service.open_view();
    store.insert_behind(habit, key("2024-06-04"));

    service
        .get_windowed_activity(view, ActivityWindow::Week, key(TODAY))
        .await
        .unwrap();

    let yesterday = service.coordinator().state(habit, key("2024-06-04")).unwrap();
    assert!(yesterday.known && yesterday.completed);
    let today = service.coordinator().state(habit, key(TODAY)).unwrap();
    assert!(today.known && !today.completed);

    // Knowing the record lets the toggle delete without a lookup
    let lists = store.lists();
    assert_eq!(service.toggle_completion(view, habit, key("2024-06-04")).await, Ok(false));
    assert_eq!(store.lists(), lists);
}

#[tokio::test]
async fn test_malformed_dates_are_skipped_not_fatal() {
    let (store, habit) = FakeStore::with_habit("Read");
    let service = ActivityService::new(store.clone(), store.clone(), store.clone(), config());
    let view = service.open_view();
    store.insert_raw(habit, "not a date");
    store.insert_raw(habit, "2024-06-05T22:15:00Z");

    let days = service
        .get_windowed_activity(view, ActivityWindow::Week, key(TODAY))
        .await
        .unwrap();
    assert_eq!(days[6].count, 1);

    let snapshot = service.get_dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.parse_error_count, 1);
    assert_eq!(snapshot.weekly_activity[6].count, 1);
}

#[tokio::test]
async fn test_streak_modes_differ_on_long_history() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();
    let habit = add_habit(service, "Read").await;

    // Ten days in April, three around late May, three ending today
    let april: Vec<String> = (10..20).map(|d| format!("2024-04-{:02}", d)).collect();
    let april: Vec<&str> = april.iter().map(String::as_str).collect();
    complete(service, view, habit, &april).await;
    complete(service, view, habit, &["2024-05-26", "2024-05-27", "2024-05-28"]).await;
    complete(service, view, habit, &["2024-06-03", "2024-06-04", "2024-06-05"]).await;

    let full = service.get_habit_streak(habit, StreakMode::Authoritative).await.unwrap();
    assert_eq!(full.current_streak, 3);
    assert_eq!(full.longest_streak, 10);
    assert_eq!(full.scope, StreakScope::Authoritative);
    assert_eq!(full.last_completion_date, Some(key(TODAY)));
    assert_eq!(full.streak_start_date, Some(key("2024-06-03")));

    let week = service
        .get_habit_streak(habit, StreakMode::Windowed(ActivityWindow::Week))
        .await
        .unwrap();
    assert_eq!(week.current_streak, 3);
    assert_eq!(week.longest_streak, 3);
    assert_eq!(week.scope, StreakScope::Windowed { days: 7 });

    let month = service
        .get_habit_streak(habit, StreakMode::Windowed(ActivityWindow::Month))
        .await
        .unwrap();
    assert_eq!(month.longest_streak, 3);
}

#[tokio::test]
async fn test_streak_survives_until_today_is_over() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();
    let habit = add_habit(service, "Read").await;
    complete(service, view, habit, &["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-04"]).await;

    let streak = service.get_habit_streak(habit, StreakMode::Authoritative).await.unwrap();
    assert_eq!(streak.current_streak, 4);
    assert_eq!(streak.longest_streak, 4);
    assert_eq!(streak.streak_start_date, Some(key("2024-06-01")));

    // The window still ends today
    let week = service
        .get_habit_streak(habit, StreakMode::Windowed(ActivityWindow::Week))
        .await
        .unwrap();
    assert_eq!(week.current_streak, 0);
}

#[tokio::test]
async fn test_streak_is_zero_after_a_missed_day() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();
    let habit = add_habit(service, "Read").await;
    complete(service, view, habit, &["2024-06-02", "2024-06-03"]).await;

    let streak = service.get_habit_streak(habit, StreakMode::Authoritative).await.unwrap();
    assert_eq!(streak.current_streak, 0);
    assert_eq!(streak.longest_streak, 2);
}

#[tokio::test]
async fn test_streak_for_unknown_habit() {
    let (store, _) = FakeStore::with_habit("Read");
    let service = ActivityService::new(store.clone(), store.clone(), store, config());
    let missing = HabitId::new();

    let err = service.get_habit_streak(missing, StreakMode::Authoritative).await.unwrap_err();
    assert_eq!(err, ServiceError::HabitNotFound(missing));
}

#[tokio::test]
async fn test_dashboard_snapshot_from_sqlite() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = sqlite_server(&temp_file);
    let service = server.service();
    let view = service.open_view();

    let read = add_habit(service, "Read").await;
    let walk = add_habit(service, "Walk").await;
    complete(service, view, read, &["2024-06-03", "2024-06-04", "2024-06-05"]).await;
    complete(service, view, walk, &["2024-06-01", "2024-05-31"]).await;

    let snapshot = service.get_dashboard_snapshot().await.unwrap();

    assert_eq!(snapshot.total_habits, 2);
    assert_eq!(snapshot.active_habits, 2);
    assert_eq!(snapshot.total_completions, 5);
    // Week starts Monday 2024-06-03
    assert_eq!(snapshot.completions_this_week, 3);
    assert_eq!(snapshot.completions_this_month, 4);
    // 4 completions over 2 habits x 5 days so far
    assert_eq!(snapshot.overall_completion_rate, 40.0);

    assert_eq!(snapshot.streaks.len(), 2);
    let read_streak = snapshot.streaks.iter().find(|s| s.habit_name == "Read").unwrap();
    assert_eq!(read_streak.streak.current_streak, 3);
    assert_eq!(read_streak.streak.scope, StreakScope::Authoritative);

    assert_eq!(snapshot.weekly_activity.len(), 7);
    assert_eq!(snapshot.monthly_activity.len(), 30);
    assert_eq!(snapshot.weekly_activity.iter().map(|d| d.count).sum::<u32>(), 5);
    assert_eq!(snapshot.parse_error_count, 0);
}

#[tokio::test]
async fn test_dashboard_tolerates_partial_analytics() {
    let (store, _) = FakeStore::with_habit("Read");
    store.set_analytics(json!({
        "total_habits": 4,
        "active_habits": "three",
        "overall_completion_rate": 140.5,
        "streaks": [{"habit_name": "no id"}],
    }));
    let service = ActivityService::new(store.clone(), store.clone(), store.clone(), config());

    let snapshot = service.get_dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.total_habits, 4);
    assert_eq!(snapshot.active_habits, 0);
    assert_eq!(snapshot.overall_completion_rate, 100.0);
    assert!(snapshot.streaks.is_empty());
}

#[tokio::test]
async fn test_dashboard_surfaces_unreachable_store() {
    let (store, _) = FakeStore::with_habit("Read");
    let down = StoreError::Transport("connection refused".to_string());
    store.fail_reads(Some(down.clone()));
    let service = ActivityService::new(store.clone(), store.clone(), store.clone(), config());

    assert_eq!(service.get_dashboard_snapshot().await.unwrap_err(), ServiceError::Store(down));
}

#[tokio::test]
async fn test_database_persistence() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let habit;
    {
        let server = sqlite_server(&temp_file);
        let service = server.service();
        let view = service.open_view();
        habit = add_habit(service, "Read").await;
        complete(service, view, habit, &[TODAY]).await;
    }

    let server = sqlite_server(&temp_file);
    let streak = server
        .service()
        .get_habit_streak(habit, StreakMode::Authoritative)
        .await
        .unwrap();
    assert_eq!(streak.current_streak, 1);
}
