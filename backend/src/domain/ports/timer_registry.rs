//! Port for per-user deferred actions.
//!
//! Scheduling under an existing key replaces the pending timer, so at most
//! one timer exists per `(user, purpose)`. Fired timers are delivered to the
//! engine as [`TimerFired`](crate::domain::TimerFired) commands.
use std::time::Duration;

use super::define_port_error;
use crate::domain::timers::{TimerHandle, TimerKey};

define_port_error! {
    /// Errors raised by timer registries.
    pub enum TimerRegistryError {
        /// The registry can no longer run timers (no runtime, dispatcher gone).
        Closed { message: String } => "timer registry is closed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TimerRegistry: Send + Sync {
    /// Schedule `key` to fire after `delay`, replacing any pending timer.
    fn schedule(&self, key: TimerKey, delay: Duration) -> Result<TimerHandle, TimerRegistryError>;

    /// Cancel a pending timer. Returns `false` when none was pending.
    fn cancel(&self, key: &TimerKey) -> bool;
}
