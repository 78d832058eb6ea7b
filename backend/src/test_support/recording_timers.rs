//! Timer registry double that keeps pending timers in a map and never fires.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::ports::{TimerRegistry, TimerRegistryError};
use crate::domain::timers::{TimerFired, TimerHandle, TimerKey};

/// One registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Scheduled { key: TimerKey, delay: Duration },
    Cancelled { key: TimerKey, was_pending: bool },
}

#[derive(Debug, Default)]
struct State {
    pending: BTreeMap<TimerKey, (TimerHandle, Duration)>,
    events: Vec<TimerEvent>,
    overlapping: usize,
}

/// Tests fire timers by hand with [`RecordingTimerRegistry::take`].
#[derive(Debug, Default)]
pub struct RecordingTimerRegistry {
    state: Mutex<State>,
    generation: AtomicU64,
}

impl RecordingTimerRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay of the pending timer for `key`.
    pub fn pending_delay(&self, key: &TimerKey) -> Option<Duration> {
        self.lock().pending.get(key).map(|(_, delay)| *delay)
    }

    pub fn pending_keys(&self) -> Vec<TimerKey> {
        self.lock().pending.keys().copied().collect()
    }

    /// Remove a pending timer and return the command it would deliver.
    pub fn take(&self, key: &TimerKey) -> Option<TimerFired> {
        self.lock()
            .pending
            .remove(key)
            .map(|(handle, _)| TimerFired { key: handle.key })
    }

    pub fn events(&self) -> Vec<TimerEvent> {
        self.lock().events.clone()
    }

    /// Times a key was scheduled while a timer for it was still pending.
    pub fn overlapping_schedules(&self) -> usize {
        self.lock().overlapping
    }
}

impl TimerRegistry for RecordingTimerRegistry {
    fn schedule(&self, key: TimerKey, delay: Duration) -> Result<TimerHandle, TimerRegistryError> {
        let handle = TimerHandle {
            key,
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let mut state = self.lock();
        if state.pending.insert(key, (handle, delay)).is_some() {
            state.overlapping += 1;
        }
        state.events.push(TimerEvent::Scheduled { key, delay });
        Ok(handle)
    }

    fn cancel(&self, key: &TimerKey) -> bool {
        let mut state = self.lock();
        let was_pending = state.pending.remove(key).is_some();
        state.events.push(TimerEvent::Cancelled {
            key: *key,
            was_pending,
        });
        was_pending
    }
}
