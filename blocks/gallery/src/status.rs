use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// How long `Saved` stays visible before falling back to `Idle`
pub const DEFAULT_SAVED_DISPLAY: Duration = Duration::from_millis(1500);

/// Save feedback for ordering writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    /// Transient. Carries no durability guarantee beyond the last batch.
    Saved,
    Failed { failed_ids: Vec<String> },
}

#[derive(Default)]
struct TrackerState {
    in_flight: usize,
    /// Bumped whenever a batch starts; stale idle timers compare against it
    generation: u64,
    next_seq: u64,
    /// Newest batch that assigned each id a position
    latest: HashMap<String, u64>,
    /// Ids whose remote position is known to be stale
    pending: BTreeSet<String>,
    /// Failures seen since in_flight last left zero
    window_failures: Vec<String>,
}

/// Shared between a manager and the batches it hands out
pub(crate) struct SaveTracker {
    status: watch::Sender<SaveStatus>,
    state: Mutex<TrackerState>,
    /// Batches dispatch one at a time; writes inside a batch still fan out
    pub(crate) dispatch: tokio::sync::Mutex<()>,
    saved_display: Duration,
}

impl SaveTracker {
    pub(crate) fn new(saved_display: Duration) -> Arc<Self> {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Arc::new(Self {
            status,
            state: Mutex::new(TrackerState::default()),
            dispatch: tokio::sync::Mutex::new(()),
            saved_display,
        })
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // A poisoned lock only means a panic elsewhere; the bookkeeping is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn current(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Claim a sequence number and record it as the newest assignment for `ids`
    pub(crate) fn stamp<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> u64 {
        let mut state = self.lock();
        state.next_seq += 1;
        let seq = state.next_seq;
        for id in ids {
            state.latest.insert(id.to_string(), seq);
        }
        seq
    }

    /// True when a newer batch has since assigned this id a position
    pub(crate) fn is_superseded(&self, image_id: &str, seq: u64) -> bool {
        self.lock().latest.get(image_id).is_some_and(|latest| *latest > seq)
    }

    pub(crate) fn pending(&self) -> Vec<String> {
        self.lock().pending.iter().cloned().collect()
    }

    pub(crate) fn mark_pending<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let mut state = self.lock();
        for id in ids {
            state.pending.insert(id.to_string());
        }
    }

    /// Drop all bookkeeping for an item that no longer exists locally
    pub(crate) fn forget(&self, image_id: &str) {
        let mut state = self.lock();
        state.pending.remove(image_id);
        state.latest.remove(image_id);
    }

    pub(crate) fn begin(&self) {
        let mut state = self.lock();
        if state.in_flight == 0 {
            state.window_failures.clear();
        }
        state.in_flight += 1;
        state.generation += 1;
        self.status.send_replace(SaveStatus::Saving);
    }

    /// Settle one batch. `positions` are the position writes that were actually
    /// sent, paired with whether they succeeded; `failed` lists every failed id.
    pub(crate) fn finish(self: &Arc<Self>, seq: u64, positions: &[(String, bool)], failed: &[String]) {
        let mut state = self.lock();

        for (id, ok) in positions {
            if state.latest.get(id).is_some_and(|latest| *latest > seq) {
                continue;
            }
            if *ok {
                state.pending.remove(id);
            } else {
                state.pending.insert(id.clone());
            }
        }

        for id in failed {
            if !state.window_failures.contains(id) {
                state.window_failures.push(id.clone());
            }
        }

        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight > 0 {
            return;
        }

        if !state.window_failures.is_empty() {
            let failed_ids = state.window_failures.clone();
            self.status.send_replace(SaveStatus::Failed { failed_ids });
            return;
        }

        self.status.send_replace(SaveStatus::Saved);
        let generation = state.generation;
        drop(state);

        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(tracker.saved_display).await;
            let state = tracker.lock();
            if state.generation == generation && state.in_flight == 0 {
                tracker.status.send_replace(SaveStatus::Idle);
            }
        });
    }

    /// Settle a batch whose dispatch was cut short. None of its writes are
    /// known to have landed: its positions go back to pending and every id it
    /// carried counts as failed.
    pub(crate) fn abandon(&self, seq: u64, positions: &[String], ids: &[String]) {
        let mut state = self.lock();

        for id in positions {
            if !state.latest.get(id).is_some_and(|latest| *latest > seq) {
                state.pending.insert(id.clone());
            }
        }
        for id in ids {
            if !state.window_failures.contains(id) {
                state.window_failures.push(id.clone());
            }
        }

        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight > 0 {
            return;
        }

        if state.window_failures.is_empty() {
            self.status.send_replace(SaveStatus::Idle);
        } else {
            let failed_ids = state.window_failures.clone();
            self.status.send_replace(SaveStatus::Failed { failed_ids });
        }
    }
}
