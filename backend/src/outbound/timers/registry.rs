//! In-process timers on the tokio runtime.
//!
//! Each pending timer is a sleeping task. Firing only enqueues a
//! [`TimerFired`] command on an unbounded channel; the dispatcher applies it.
//! Timers do not survive a restart; the engine rehydrates them at boot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::ports::{TimerRegistry, TimerRegistryError};
use crate::domain::{TimerFired, TimerHandle, TimerKey};

struct PendingTimer {
    generation: u64,
    abort: AbortHandle,
}

struct Shared {
    pending: Mutex<HashMap<TimerKey, PendingTimer>>,
    generations: AtomicU64,
    fired: mpsc::UnboundedSender<TimerFired>,
}

impl Shared {
    /// Remove `key` only if it still belongs to `generation`.
    fn release(&self, key: TimerKey, generation: u64) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.get(&key) {
            Some(timer) if timer.generation == generation => {
                pending.remove(&key);
                true
            }
            _ => false,
        }
    }
}

/// Timer registry that runs each timer as a tokio task.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use subscription_backend::domain::ports::TimerRegistry;
/// use subscription_backend::domain::{TimerKey, TimerPurpose, UserId};
/// use subscription_backend::outbound::timers::TokioTimerRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (registry, mut fired) = TokioTimerRegistry::new();
/// let key = TimerKey::new(UserId::new(7), TimerPurpose::DisclaimerWarning);
/// registry.schedule(key, Duration::ZERO).expect("schedule");
/// assert_eq!(fired.recv().await.map(|f| f.key), Some(key));
/// # }
/// ```
#[derive(Clone)]
pub struct TokioTimerRegistry {
    shared: Arc<Shared>,
}

impl TokioTimerRegistry {
    /// Create a registry and the receiving end its timers fire into.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            pending: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
            fired: tx,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl TimerRegistry for TokioTimerRegistry {
    fn schedule(&self, key: TimerKey, delay: Duration) -> Result<TimerHandle, TimerRegistryError> {
        let runtime = Handle::try_current()
            .map_err(|error| TimerRegistryError::closed(error.to_string()))?;
        if self.shared.fired.is_closed() {
            return Err(TimerRegistryError::closed("timer dispatcher has stopped"));
        }

        let generation = self.shared.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let shared = Arc::clone(&self.shared);
        // The delay counts from this call, not from the task's first poll.
        let deadline = Instant::now().checked_add(delay);
        let task = runtime.spawn(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            if !shared.release(key, generation) {
                return;
            }
            debug!(timer = %key, "timer fired");
            if shared.fired.send(TimerFired { key }).is_err() {
                warn!(timer = %key, "timer fired after dispatcher stopped");
            }
        });

        let previous = pending.insert(
            key,
            PendingTimer {
                generation,
                abort: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.abort.abort();
            debug!(timer = %key, "pending timer replaced");
        }
        Ok(TimerHandle { key, generation })
    }

    fn cancel(&self, key: &TimerKey) -> bool {
        let removed = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        match removed {
            Some(timer) => {
                timer.abort.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TimerPurpose, UserId};
    use tokio::sync::mpsc::error::TryRecvError;

    fn key(id: i64, purpose: TimerPurpose) -> TimerKey {
        TimerKey::new(UserId::new(id), purpose)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (registry, mut fired) = TokioTimerRegistry::new();
        let warning = key(1, TimerPurpose::DisclaimerWarning);
        registry
            .schedule(warning, Duration::from_secs(3600))
            .expect("schedule");

        tokio::time::advance(Duration::from_secs(3599)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Err(TryRecvError::Empty));

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Ok(TimerFired { key: warning }));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_schedule_not_first_poll() {
        let (registry, mut fired) = TokioTimerRegistry::new();
        let warning = key(7, TimerPurpose::DisclaimerWarning);
        registry
            .schedule(warning, Duration::from_secs(10))
            .expect("schedule");

        // Time moves before the spawned task gets a chance to run.
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Ok(TimerFired { key: warning }));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_pending_timer() {
        let (registry, mut fired) = TokioTimerRegistry::new();
        let cancel = key(2, TimerPurpose::FinalCancel);
        let first = registry
            .schedule(cancel, Duration::from_secs(10))
            .expect("first");
        let second = registry
            .schedule(cancel, Duration::from_secs(60))
            .expect("second");
        assert!(second.generation > first.generation);
        assert_eq!(registry.pending_count(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Err(TryRecvError::Empty));

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Ok(TimerFired { key: cancel }));
        settle().await;
        assert_eq!(fired.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (registry, mut fired) = TokioTimerRegistry::new();
        let warning = key(3, TimerPurpose::DisclaimerWarning);
        registry
            .schedule(warning, Duration::from_secs(5))
            .expect("schedule");

        assert!(registry.cancel(&warning));
        assert!(!registry.cancel(&warning));

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_for_other_purposes_are_independent() {
        let (registry, mut fired) = TokioTimerRegistry::new();
        let warning = key(4, TimerPurpose::DisclaimerWarning);
        let cancel = key(4, TimerPurpose::FinalCancel);
        registry.schedule(warning, Duration::from_secs(5)).expect("warning");
        registry.schedule(cancel, Duration::from_secs(5)).expect("cancel");
        assert!(registry.cancel(&warning));

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(fired.try_recv(), Ok(TimerFired { key: cancel }));
    }

    #[tokio::test]
    async fn closed_dispatcher_rejects_new_timers() {
        let (registry, fired) = TokioTimerRegistry::new();
        drop(fired);
        let result = registry.schedule(key(5, TimerPurpose::FinalCancel), Duration::ZERO);
        assert!(matches!(result, Err(TimerRegistryError::Closed { .. })));
    }

    #[test]
    fn scheduling_outside_a_runtime_fails() {
        let (registry, _fired) = TokioTimerRegistry::new();
        let result = registry.schedule(key(6, TimerPurpose::FinalCancel), Duration::ZERO);
        assert!(matches!(result, Err(TimerRegistryError::Closed { .. })));
    }
}
