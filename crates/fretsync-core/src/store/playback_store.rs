//! Playback state store with deduplication, burst coalescing and change notification.
//!
//! # Update pipeline
//!
//! 1. An incoming [`StateUpdate`] whose fingerprint matches the previous
//!    accepted update is discarded.
//! 2. Accepted updates merge into a pending update. The coalescing window
//!    opens with the first pending update and closes `debounce_window` later;
//!    later fields overwrite earlier ones.
//! 3. When the window closes the merged update is applied. If no field moved
//!    beyond the tolerance nothing is stored and observers are not notified.
//!
//! Time is passed in explicitly, so the store never sleeps or spawns timers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::controls::PlaybackControls;
use super::state::{PlaybackState, StateUpdate};
use crate::clock::Deadline;
use crate::config::StoreConfig;

type Subscriber = Arc<dyn Fn(&PlaybackState) + Send + Sync>;

/// Handle returned by [`PlaybackStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What happened to an update passed to [`PlaybackStore::update_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same content as the previous accepted update.
    Duplicate,
    /// Merged into the open coalescing window.
    Pending,
}

struct PendingUpdate {
    update: StateUpdate,
    deadline: Deadline,
}

struct StoreInner {
    state: PlaybackState,
    pending: Option<PendingUpdate>,
    last_fingerprint: Option<u64>,
    controls: Option<Arc<dyn PlaybackControls>>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

#[derive(Default)]
struct StoreStats {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    transitions: AtomicU64,
    unhandled_controls: AtomicU64,
}

/// Single-writer, multi-reader holder of the canonical [`PlaybackState`].
pub struct PlaybackStore {
    inner: Mutex<StoreInner>,
    snapshot: ArcSwap<PlaybackState>,
    debounce_window: Duration,
    tolerance: f64,
    stats: StoreStats,
}

impl PlaybackStore {
    pub fn new(config: &StoreConfig) -> Self {
        let state = PlaybackState::default();
        Self {
            inner: Mutex::new(StoreInner {
                state,
                pending: None,
                last_fingerprint: None,
                controls: None,
                subscribers: Vec::new(),
                next_subscription: 0,
            }),
            snapshot: ArcSwap::from_pointee(state),
            debounce_window: config.debounce_window(),
            tolerance: config.tolerance,
            stats: StoreStats::default(),
        }
    }

    /// Current state, lock-free.
    pub fn snapshot(&self) -> Arc<PlaybackState> {
        self.snapshot.load_full()
    }

    pub fn state(&self) -> PlaybackState {
        **self.snapshot.load()
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Queues `update` for the current coalescing window.
    ///
    /// A window that has already closed at `now` is flushed first, so a
    /// steady stream of updates keeps the state moving without a separate tick.
    pub fn update_state(&self, update: StateUpdate, now: Duration) -> UpdateOutcome {
        let fingerprint = update.fingerprint();

        let notify = {
            let mut inner = self.inner.lock();

            if inner.last_fingerprint == Some(fingerprint) {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Discarded duplicate playback update");
                return UpdateOutcome::Duplicate;
            }
            inner.last_fingerprint = Some(fingerprint);
            self.stats.accepted.fetch_add(1, Ordering::Relaxed);

            let closed = inner
                .pending
                .as_ref()
                .is_some_and(|pending| pending.deadline.is_due(now));
            let notify = if closed { self.apply_pending(&mut inner) } else { None };

            match inner.pending.as_mut() {
                Some(pending) => pending.update = pending.update.merge(update),
                None => {
                    inner.pending = Some(PendingUpdate {
                        update,
                        deadline: Deadline::after(now, self.debounce_window),
                    });
                }
            }

            notify
        };

        self.notify(notify);
        UpdateOutcome::Pending
    }

    /// Applies the pending update if its window has closed. Returns whether
    /// observers were notified.
    pub fn flush_due(&self, now: Duration) -> bool {
        let notify = {
            let mut inner = self.inner.lock();
            let due = inner
                .pending
                .as_ref()
                .is_some_and(|pending| pending.deadline.is_due(now));
            if due {
                self.apply_pending(&mut inner)
            } else {
                None
            }
        };
        self.notify(notify)
    }

    /// Applies the pending update immediately, ignoring the window.
    pub fn flush(&self) -> bool {
        let notify = {
            let mut inner = self.inner.lock();
            self.apply_pending(&mut inner)
        };
        self.notify(notify)
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// When the open window closes, if one is open.
    pub fn pending_deadline(&self) -> Option<Duration> {
        self.inner
            .lock()
            .pending
            .as_ref()
            .map(|pending| pending.deadline.at())
    }

    /// Returns the store to idle defaults, dropping any pending update.
    /// Subscribers and registered controls are kept.
    pub fn reset(&self) {
        let notify = {
            let mut inner = self.inner.lock();
            inner.pending = None;
            inner.last_fingerprint = None;
            let idle = PlaybackState::default();
            if inner.state == idle {
                None
            } else {
                inner.state = idle;
                self.snapshot.store(Arc::new(idle));
                self.stats.transitions.fetch_add(1, Ordering::Relaxed);
                Some((idle, Self::subscriber_list(&inner)))
            }
        };
        self.notify(notify);
    }

    fn apply_pending(&self, inner: &mut StoreInner) -> Option<(PlaybackState, Vec<Subscriber>)> {
        let pending = inner.pending.take()?;
        let next = pending.update.apply_to(&inner.state);

        if !inner.state.differs_from(&next, self.tolerance) {
            tracing::trace!("Pending playback update below tolerance, dropped");
            return None;
        }

        inner.state = next;
        self.snapshot.store(Arc::new(next));
        self.stats.transitions.fetch_add(1, Ordering::Relaxed);
        Some((next, Self::subscriber_list(inner)))
    }

    fn subscriber_list(inner: &StoreInner) -> Vec<Subscriber> {
        inner
            .subscribers
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect()
    }

    // Runs outside the lock so subscribers may call back into the store.
    fn notify(&self, notify: Option<(PlaybackState, Vec<Subscriber>)>) -> bool {
        let Some((state, subscribers)) = notify else {
            return false;
        };
        for subscriber in subscribers {
            subscriber(&state);
        }
        true
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&PlaybackState) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    /// Installs the transport implementation. The previous one, if any, is replaced.
    pub fn register_controls(&self, controls: Arc<dyn PlaybackControls>) {
        let previous = self.inner.lock().controls.replace(controls);
        if previous.is_some() {
            tracing::debug!("Replaced previously registered playback controls");
        } else {
            tracing::debug!("Registered playback controls");
        }
    }

    pub fn clear_controls(&self) {
        self.inner.lock().controls = None;
    }

    pub fn has_controls(&self) -> bool {
        self.inner.lock().controls.is_some()
    }

    pub fn play(&self) {
        self.dispatch("play", |controls| controls.play());
    }

    pub fn pause(&self) {
        self.dispatch("pause", |controls| controls.pause());
    }

    pub fn stop(&self) {
        self.dispatch("stop", |controls| controls.stop());
    }

    pub fn toggle(&self) {
        self.dispatch("toggle", |controls| controls.toggle());
    }

    pub fn seek(&self, time: f64) {
        if !time.is_finite() {
            tracing::warn!(time, "Ignoring seek to non-finite time");
            return;
        }
        self.dispatch("seek", |controls| controls.seek(time.max(0.0)));
    }

    pub fn set_volume(&self, volume: f64) {
        if !volume.is_finite() {
            tracing::warn!(volume, "Ignoring non-finite volume");
            return;
        }
        self.dispatch("set_volume", |controls| {
            controls.set_volume(volume.clamp(0.0, 1.0))
        });
    }

    fn dispatch(&self, operation: &'static str, call: impl FnOnce(&dyn PlaybackControls)) {
        let controls = self.inner.lock().controls.clone();
        match controls {
            Some(controls) => call(controls.as_ref()),
            None => {
                self.stats.unhandled_controls.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(operation, "No playback controls registered; call ignored");
            }
        }
    }

    /// Updates that passed deduplication.
    pub fn accepted_updates(&self) -> u64 {
        self.stats.accepted.load(Ordering::Relaxed)
    }

    pub fn discarded_duplicates(&self) -> u64 {
        self.stats.duplicates.load(Ordering::Relaxed)
    }

    /// State transitions, each of which notified observers once.
    pub fn transitions(&self) -> u64 {
        self.stats.transitions.load(Ordering::Relaxed)
    }

    /// Control calls made while no controls were registered.
    pub fn unhandled_control_calls(&self) -> u64 {
        self.stats.unhandled_controls.load(Ordering::Relaxed)
    }
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}
