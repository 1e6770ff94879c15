/// Toggle coordination against a store double
use std::sync::Arc;

use habit_activity::*;
use tokio_test::{assert_pending, task};

use crate::support::{key, FakeStore};

fn coordinator(store: &Arc<FakeStore>) -> (ToggleCoordinator, ViewId) {
    let coordinator = ToggleCoordinator::new(store.clone());
    let view = coordinator.open_view();
    (coordinator, view)
}

#[tokio::test]
async fn test_toggle_flips_and_flips_back() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    assert!(coord.toggle(view, habit, day).await.unwrap());
    assert!(store.is_completed(habit, day));

    assert!(!coord.toggle(view, habit, day).await.unwrap());
    assert!(!store.is_completed(habit, day));

    let state = coord.state(habit, day).unwrap();
    assert_eq!(state.phase, TogglePhase::Idle);
    assert!(!state.completed);
    assert!(state.known);
}

#[tokio::test]
async fn test_double_toggle_issues_one_mutation() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");
    let gate = store.close_gate();

    let (first, second, ()) = tokio::join!(coord.toggle(view, habit, day), coord.toggle(view, habit, day), async {
        tokio::task::yield_now().await;
        assert!(coord.is_pending(habit, day));
        gate.notify_waiters();
    });

    assert_eq!(first, Ok(true));
    assert_eq!(second, Ok(true));
    assert_eq!(store.creates(), 1);
    assert_eq!(store.deletes(), 0);
    assert!(!coord.is_pending(habit, day));
}

#[tokio::test]
async fn test_different_keys_do_not_wait_on_each_other() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let (monday, tuesday) = (key("2024-06-03"), key("2024-06-04"));
    let gate = store.close_gate();

    let (a, b, ()) = tokio::join!(coord.toggle(view, habit, monday), coord.toggle(view, habit, tuesday), async {
        tokio::task::yield_now().await;
        // Both mutations reached the store before either finished
        assert_eq!(store.creates(), 2);
        assert!(coord.is_pending(habit, monday));
        assert!(coord.is_pending(habit, tuesday));
        gate.notify_waiters();
    });

    assert_eq!(a, Ok(true));
    assert_eq!(b, Ok(true));
}

#[tokio::test]
async fn test_existing_completion_from_elsewhere_is_reverted() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    // We last saw the day as not completed
    let token = coord.begin_read(view);
    assert!(coord.observe(&token, habit, day, None));

    store.insert_behind(habit, day);

    assert_eq!(coord.toggle(view, habit, day).await, Ok(false));
    assert_eq!(store.creates(), 1);
    assert_eq!(store.deletes(), 1);
    assert!(!store.is_completed(habit, day));
    assert!(!coord.state(habit, day).unwrap().completed);
}

#[tokio::test]
async fn test_failed_revert_of_existing_completion_settles_not_completed() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    let token = coord.begin_read(view);
    assert!(coord.observe(&token, habit, day, None));
    store.insert_behind(habit, day);

    let down = StoreError::Transport("connection reset".to_string());
    store.fail_next_delete(down.clone());
    assert_eq!(coord.toggle(view, habit, day).await, Err(ToggleError::Store(down)));

    assert_eq!(store.creates(), 1);
    assert_eq!(store.deletes(), 1);
    // The other session's completion is still there
    assert!(store.is_completed(habit, day));
    let state = coord.state(habit, day).unwrap();
    assert!(!state.completed);
    assert_eq!(state.phase, TogglePhase::Idle);
    assert!(!coord.is_pending(habit, day));
}

#[tokio::test]
async fn test_failed_lookup_after_duplicate_settles_not_completed() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    let token = coord.begin_read(view);
    assert!(coord.observe(&token, habit, day, None));
    store.insert_behind(habit, day);

    let down = StoreError::Transport("connection refused".to_string());
    store.fail_reads(Some(down.clone()));
    assert_eq!(coord.toggle(view, habit, day).await, Err(ToggleError::Store(down)));

    assert_eq!(store.lists(), 1);
    assert_eq!(store.deletes(), 0);
    assert!(!coord.state(habit, day).unwrap().completed);
    assert!(!coord.is_pending(habit, day));
}

#[tokio::test]
async fn test_unknown_state_consults_store_first() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");
    store.insert_behind(habit, day);

    assert_eq!(coord.toggle(view, habit, day).await, Ok(false));
    assert_eq!(store.creates(), 0);
    assert_eq!(store.deletes(), 1);
}

#[tokio::test]
async fn test_delete_of_missing_record_settles_not_completed() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    assert_eq!(coord.toggle(view, habit, day).await, Ok(true));
    store.remove_behind(habit, day);

    assert_eq!(coord.toggle(view, habit, day).await, Ok(false));
    assert_eq!(store.deletes(), 1);
    let state = coord.state(habit, day).unwrap();
    assert!(!state.completed);
    assert!(state.record_id.is_none());
}

#[tokio::test]
async fn test_unreachable_store_keeps_prior_state() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    assert_eq!(coord.toggle(view, habit, day).await, Ok(true));

    let down = StoreError::Transport("connection refused".to_string());
    store.fail_next_mutation(down.clone());
    assert_eq!(coord.toggle(view, habit, day).await, Err(ToggleError::Store(down)));

    let state = coord.state(habit, day).unwrap();
    assert!(state.completed);
    assert_eq!(state.phase, TogglePhase::Idle);
    assert!(!coord.is_pending(habit, day));
    assert!(store.is_completed(habit, day));

    // The next attempt goes through
    assert_eq!(coord.toggle(view, habit, day).await, Ok(false));
}

#[tokio::test]
async fn test_failed_first_toggle_leaves_not_completed() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    store.fail_next_mutation(StoreError::Timeout(std::time::Duration::from_secs(10)));
    assert!(coord.toggle(view, habit, day).await.is_err());

    let state = coord.state(habit, day).unwrap();
    assert!(!state.completed);
    assert_eq!(state.phase, TogglePhase::Idle);
}

#[tokio::test]
async fn test_closed_view_is_rejected() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    coord.close_view(view);

    let result = coord.toggle(view, habit, key("2024-06-05")).await;
    assert_eq!(result, Err(ToggleError::Stale(view)));
    assert_eq!(store.creates(), 0);
}

#[tokio::test]
async fn test_result_for_view_closed_mid_flight_is_discarded() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");
    let gate = store.close_gate();

    let (result, ()) = tokio::join!(coord.toggle(view, habit, day), async {
        tokio::task::yield_now().await;
        coord.close_view(view);
        gate.notify_waiters();
    });

    assert_eq!(result, Err(ToggleError::Stale(view)));
    // The store call itself completed and the ledger reflects it
    assert!(store.is_completed(habit, day));
    assert!(coord.state(habit, day).unwrap().completed);
}

#[tokio::test]
async fn test_abandoned_toggle_does_not_stay_pending() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");
    let _gate = store.close_gate();

    // Poll once so the mutation starts, then drop it
    let mut abandoned = task::spawn(coord.toggle(view, habit, day));
    assert_pending!(abandoned.poll());
    assert!(coord.is_pending(habit, day));
    drop(abandoned);

    assert!(!coord.is_pending(habit, day));
    let state = coord.state(habit, day).unwrap();
    assert_eq!(state.phase, TogglePhase::Idle);
    // The dropped call may or may not have landed
    assert!(!state.known);

    store.open_gate();
    assert_eq!(coord.toggle(view, habit, day).await, Ok(true));
    assert_eq!(store.creates(), 2);
}

#[tokio::test]
async fn test_read_issued_before_toggle_is_discarded() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");

    let token = coord.begin_read(view);
    assert_eq!(coord.toggle(view, habit, day).await, Ok(true));

    assert!(!coord.observe(&token, habit, day, None));
    assert!(coord.state(habit, day).unwrap().completed);

    let fresh = coord.begin_read(view);
    assert!(coord.observe(&fresh, habit, day, None));
    assert!(!coord.state(habit, day).unwrap().completed);
}

#[tokio::test]
async fn test_read_during_flight_is_discarded() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);
    let day = key("2024-06-05");
    let gate = store.close_gate();

    let (result, ()) = tokio::join!(coord.toggle(view, habit, day), async {
        tokio::task::yield_now().await;
        let token = coord.begin_read(view);
        assert!(!coord.observe(&token, habit, day, None));
        gate.notify_waiters();
    });

    assert_eq!(result, Ok(true));
}

#[tokio::test]
async fn test_reads_for_closed_view_are_discarded() {
    let (store, habit) = FakeStore::with_habit("Read");
    let (coord, view) = coordinator(&store);

    let token = coord.begin_read(view);
    coord.close_view(view);
    assert!(!coord.observe(&token, habit, key("2024-06-05"), None));
    assert!(coord.state(habit, key("2024-06-05")).is_none());
}
