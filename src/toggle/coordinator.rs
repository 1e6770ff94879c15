/// Idempotent completion toggling for one (habit, day) at a time
///
/// Each key moves Idle -> Pending -> Idle. While a key is Pending, further
/// toggles for it join the in-flight operation instead of issuing another
/// store call, and all of them resolve to the same outcome. Different keys
/// never wait on each other.
///
/// The store may have been changed by another session since we last looked.
/// A create that hits an existing completion means someone else already
/// completed the day, so the toggle removes it; a delete that finds nothing
/// means someone else already removed it, so the toggle is done. Only an
/// unreachable store is reported to the caller, with local state untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;

use crate::analytics::CompletionIndex;
use crate::domain::{CompletionId, DateKey, HabitId};
use crate::storage::{CompletionStore, StoreError};
use crate::toggle::{RequestToken, ToggleError, ToggleKey, TogglePhase, ToggleState, ViewId};

type ToggleFuture = BoxFuture<'static, Result<bool, StoreError>>;

/// Known truth for a key at some point
#[derive(Debug, Clone, Copy)]
struct Presence {
    completed: bool,
    record_id: Option<CompletionId>,
}

impl Presence {
    const ABSENT: Presence = Presence {
        completed: false,
        record_id: None,
    };

    fn present(record_id: CompletionId) -> Self {
        Self {
            completed: true,
            record_id: Some(record_id),
        }
    }
}

/// A store round trip that could not finish
struct Failed {
    error: StoreError,
    /// Truth before the call, if known; restored on settle
    prior: Option<Presence>,
}

struct InFlight {
    ticket: u64,
    op: WeakShared<ToggleFuture>,
}

#[derive(Default)]
struct Ledger {
    states: HashMap<ToggleKey, ToggleState>,
    in_flight: HashMap<ToggleKey, InFlight>,
    live_views: HashSet<ViewId>,
    next_view: u64,
    next_ticket: u64,
    clock: u64,
}

impl Ledger {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn record(&mut self, key: ToggleKey, presence: Presence) {
        let generation = self.tick();
        let state = self.states.entry(key).or_insert_with(|| ToggleState::unknown(key));
        state.phase = TogglePhase::Idle;
        state.completed = presence.completed;
        state.record_id = presence.record_id;
        state.known = true;
        state.generation = generation;
    }

    fn release(&mut self, key: ToggleKey, ticket: u64) {
        if self.in_flight.get(&key).map_or(false, |f| f.ticket == ticket) {
            self.in_flight.remove(&key);
        }
    }

    /// Return an abandoned key to Idle unless a newer operation owns it
    ///
    /// The dropped store call may or may not have been applied, so the
    /// value is no longer known.
    fn abandon(&mut self, key: ToggleKey) {
        if self.in_flight.contains_key(&key) {
            return;
        }
        let generation = self.tick();
        if let Some(state) = self.states.get_mut(&key) {
            state.phase = TogglePhase::Idle;
            state.known = false;
            state.generation = generation;
        }
    }

    fn is_current(&self, token: &RequestToken, key: ToggleKey) -> bool {
        self.live_views.contains(&token.view)
            && !self.in_flight.contains_key(&key)
            && self.states.get(&key).map_or(true, |s| s.generation <= token.issued_at)
    }
}

/// Settles a key when its in-flight operation finishes or is dropped
struct SettleGuard {
    ledger: Arc<Mutex<Ledger>>,
    key: ToggleKey,
    ticket: u64,
    armed: bool,
}

impl SettleGuard {
    fn settle(mut self, outcome: Result<Presence, Failed>) -> Result<bool, StoreError> {
        self.armed = false;
        let mut ledger = self.ledger.lock();
        ledger.release(self.key, self.ticket);

        match outcome {
            Ok(presence) => {
                ledger.record(self.key, presence);
                tracing::debug!(
                    "Toggle settled: habit {} on {} -> completed={}",
                    self.key.habit_id,
                    self.key.date,
                    presence.completed
                );
                Ok(presence.completed)
            }
            Err(Failed { error, prior }) => {
                match prior {
                    Some(prior) => ledger.record(self.key, prior),
                    None => {
                        if let Some(state) = ledger.states.get_mut(&self.key) {
                            state.phase = TogglePhase::Idle;
                        }
                    }
                }
                tracing::warn!(
                    "Toggle failed for habit {} on {}: {}",
                    self.key.habit_id,
                    self.key.date,
                    error
                );
                Err(error)
            }
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Every waiter went away before the store answered
        let mut ledger = self.ledger.lock();
        ledger.release(self.key, self.ticket);
        ledger.abandon(self.key);
        tracing::debug!("Toggle abandoned: habit {} on {}", self.key.habit_id, self.key.date);
    }
}

/// Owns all `ToggleState`; nothing else writes to it
#[derive(Clone)]
pub struct ToggleCoordinator {
    store: Arc<dyn CompletionStore>,
    ledger: Arc<Mutex<Ledger>>,
}

impl ToggleCoordinator {
    pub fn new(store: Arc<dyn CompletionStore>) -> Self {
        Self {
            store,
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// Register a new view instance
    pub fn open_view(&self) -> ViewId {
        let mut ledger = self.ledger.lock();
        ledger.next_view += 1;
        let view = ViewId(ledger.next_view);
        ledger.live_views.insert(view);
        view
    }

    /// Retire a view; its outstanding results will be discarded
    pub fn close_view(&self, view: ViewId) {
        if self.ledger.lock().live_views.remove(&view) {
            tracing::debug!("Closed view {:?}", view);
        }
    }

    pub fn is_view_open(&self, view: ViewId) -> bool {
        self.ledger.lock().live_views.contains(&view)
    }

    /// Take a token before reading from the store on behalf of `view`
    pub fn begin_read(&self, view: ViewId) -> RequestToken {
        let ledger = self.ledger.lock();
        RequestToken {
            view,
            issued_at: ledger.clock,
        }
    }

    /// Apply an observed presence if `token` is still current for the key
    ///
    /// Returns whether the observation was applied.
    pub fn observe(&self, token: &RequestToken, habit_id: HabitId, date: DateKey, record_id: Option<CompletionId>) -> bool {
        let key = ToggleKey::new(habit_id, date);
        let mut ledger = self.ledger.lock();
        if !ledger.is_current(token, key) {
            tracing::debug!("Discarding stale read for habit {} on {}", habit_id, date);
            return false;
        }
        let presence = record_id.map(Presence::present).unwrap_or(Presence::ABSENT);
        ledger.record(key, presence);
        true
    }

    /// Apply every (habit, day) in `days` from a freshly built index
    ///
    /// Pairs absent from the index are recorded as not completed. Returns
    /// how many keys were applied.
    pub fn observe_index<I>(&self, token: &RequestToken, index: &CompletionIndex, habits: I, days: &[DateKey]) -> usize
    where
        I: IntoIterator<Item = HabitId>,
    {
        let mut applied = 0;
        for habit_id in habits {
            for date in days {
                if self.observe(token, habit_id, *date, index.record_id(habit_id, *date)) {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Current state of a key, if the coordinator has seen it
    pub fn state(&self, habit_id: HabitId, date: DateKey) -> Option<ToggleState> {
        self.ledger.lock().states.get(&ToggleKey::new(habit_id, date)).cloned()
    }

    pub fn is_pending(&self, habit_id: HabitId, date: DateKey) -> bool {
        self.ledger.lock().in_flight.contains_key(&ToggleKey::new(habit_id, date))
    }

    /// Flip completion of `habit_id` on `date`, returning the final state
    pub async fn toggle(&self, view: ViewId, habit_id: HabitId, date: DateKey) -> Result<bool, ToggleError> {
        let key = ToggleKey::new(habit_id, date);
        let op = self.join_or_start(view, key)?;
        let result = op.await;

        if !self.is_view_open(view) {
            tracing::warn!("Dropping toggle result for closed view {:?}", view);
            return Err(ToggleError::Stale(view));
        }
        result.map_err(ToggleError::from)
    }

    fn join_or_start(&self, view: ViewId, key: ToggleKey) -> Result<Shared<ToggleFuture>, ToggleError> {
        let mut ledger = self.ledger.lock();
        if !ledger.live_views.contains(&view) {
            return Err(ToggleError::Stale(view));
        }

        if let Some(op) = ledger.in_flight.get(&key).and_then(|f| f.op.upgrade()) {
            tracing::debug!("Coalescing toggle for habit {} on {}", key.habit_id, key.date);
            return Ok(op);
        }

        let prior = ledger.states.get(&key).filter(|s| s.known).map(|s| Presence {
            completed: s.completed,
            record_id: s.record_id,
        });
        ledger
            .states
            .entry(key)
            .or_insert_with(|| ToggleState::unknown(key))
            .phase = TogglePhase::Pending;

        ledger.next_ticket += 1;
        let ticket = ledger.next_ticket;
        let guard = SettleGuard {
            ledger: Arc::clone(&self.ledger),
            key,
            ticket,
            armed: true,
        };
        let store = Arc::clone(&self.store);
        let op: Shared<ToggleFuture> = async move {
            let outcome = execute(store.as_ref(), key, prior).await;
            guard.settle(outcome)
        }
        .boxed()
        .shared();

        if let Some(weak) = op.downgrade() {
            ledger.in_flight.insert(key, InFlight { ticket, op: weak });
        }
        tracing::debug!("Toggle pending: habit {} on {}", key.habit_id, key.date);
        Ok(op)
    }
}

/// One full toggle round trip against the store
async fn execute(store: &dyn CompletionStore, key: ToggleKey, prior: Option<Presence>) -> Result<Presence, Failed> {
    let current = match prior {
        Some(p) if !p.completed || p.record_id.is_some() => p,
        _ => lookup(store, key).await.map_err(|error| Failed { error, prior })?,
    };

    match current.record_id.filter(|_| current.completed) {
        Some(record_id) => remove(store, key, record_id, current).await,
        None => add(store, key).await,
    }
}

/// Ask the store whether `key` is completed right now
async fn lookup(store: &dyn CompletionStore, key: ToggleKey) -> Result<Presence, StoreError> {
    let records = store
        .list_completions(key.habit_id, Some(key.date), Some(key.date))
        .await?;

    Ok(records
        .iter()
        .find(|r| r.is_for(key.habit_id, key.date))
        .map(|r| Presence::present(r.id))
        .unwrap_or(Presence::ABSENT))
}

async fn remove(store: &dyn CompletionStore, key: ToggleKey, record_id: CompletionId, current: Presence) -> Result<Presence, Failed> {
    match store.delete_completion(record_id).await {
        Ok(()) => Ok(Presence::ABSENT),
        Err(StoreError::NotFound { .. }) => {
            tracing::debug!("Completion {} already removed for habit {} on {}", record_id, key.habit_id, key.date);
            Ok(Presence::ABSENT)
        }
        Err(error) => Err(Failed {
            error,
            prior: Some(current),
        }),
    }
}

async fn add(store: &dyn CompletionStore, key: ToggleKey) -> Result<Presence, Failed> {
    let failed = |error| Failed {
        error,
        prior: Some(Presence::ABSENT),
    };

    match store.create_completion(key.habit_id, key.date).await {
        Ok(record) => Ok(Presence::present(record.id)),
        Err(StoreError::DuplicateCompletion { .. }) => {
            // Another actor completed it first; the flip intent means undo it
            tracing::debug!("Habit {} already completed on {} elsewhere, reverting", key.habit_id, key.date);
            let existing = lookup(store, key).await.map_err(failed)?;
            match existing.record_id {
                Some(record_id) => remove(store, key, record_id, Presence::ABSENT).await,
                None => Ok(Presence::ABSENT),
            }
        }
        Err(error) => Err(failed(error)),
    }
}
