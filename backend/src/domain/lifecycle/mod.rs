//! Subscription lifecycle engine.
//!
//! The engine owns every state transition of a subscription record. Chat and
//! payment adapters reach it through [`SubscriptionCommands`]; the timer
//! dispatcher and the daily sweep call it directly. Each handler takes the
//! user's lock, re-reads the record, checks the transition table, then
//! persists, adjusts timers, and notifies, in that order. Only record store
//! failures abort a handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::ports::{
    NotificationPort, RecordStore, SubscriptionCommands, TimerRegistry,
};
use crate::domain::subscription::UserId;
use crate::domain::timers::{TimerKey, TimerPurpose};

mod config;
mod confirmation;
mod disclaimer_timers;
mod error;
mod messages;
mod onboarding;
mod outcomes;
mod payment;
mod removal;
mod schedule;
mod sweep;
mod transitions;
mod user_locks;

pub use config::{
    DEFAULT_CONFIRMATION_KEYWORD, DEFAULT_DISCLAIMER_WARNING, DEFAULT_FINAL_CANCEL,
    DEFAULT_INVITE_VALIDITY, DEFAULT_PAYMENT_GRACE, DEFAULT_REMINDER_LEAD, DEFAULT_TRIAL_DAYS,
    LifecycleConfig,
};
pub use confirmation::{ConfirmationRejection, parse_confirmation};
pub use error::LifecycleError;
pub use outcomes::{
    ConfirmationOutcome, PaymentEvent, PaymentOutcome, StartOutcome, SweepReport, TimerOutcome,
};
pub use schedule::{DailySweepScheduler, Sleeper, TokioSleeper, next_sweep_after};
pub use sweep::{SweepAction, due_action};
pub use transitions::{Decision, Trigger, decide};

use messages::MessageCatalogue;
use user_locks::{EmailLocks, UserLocks};

/// Outbound ports the engine drives.
pub struct LifecyclePorts {
    pub store: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn NotificationPort>,
    pub timers: Arc<dyn TimerRegistry>,
}

impl LifecyclePorts {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn NotificationPort>,
        timers: Arc<dyn TimerRegistry>,
    ) -> Self {
        Self {
            store,
            notifier,
            timers,
        }
    }
}

/// Domain-owned lifecycle engine.
pub struct LifecycleEngine {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn NotificationPort>,
    timers: Arc<dyn TimerRegistry>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
    messages: MessageCatalogue,
    locks: UserLocks,
    email_locks: EmailLocks,
}

impl LifecycleEngine {
    pub fn new(ports: LifecyclePorts, clock: Arc<dyn Clock>, config: LifecycleConfig) -> Self {
        let LifecyclePorts {
            store,
            notifier,
            timers,
        } = ports;
        Self {
            store,
            notifier,
            timers,
            clock,
            messages: MessageCatalogue::new(&config),
            config,
            locks: UserLocks::default(),
            email_locks: EmailLocks::default(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Send a message, logging instead of failing.
    async fn notify(&self, user_id: UserId, text: &str) -> bool {
        match self.notifier.send_message(user_id, text).await {
            Ok(()) => true,
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "failed to deliver chat message");
                false
            }
        }
    }

    /// Replace the pending timer for `(user_id, purpose)`.
    fn arm_timer(&self, user_id: UserId, purpose: TimerPurpose, delay: Duration) {
        let key = TimerKey::new(user_id, purpose);
        self.timers.cancel(&key);
        if let Err(error) = self.timers.schedule(key, delay) {
            // The sweep picks up overdue disclaimer steps if the timer is lost.
            warn!(timer = %key, error = %error, "failed to schedule timer");
        }
    }

    fn disarm_timer(&self, user_id: UserId, purpose: TimerPurpose) {
        self.timers.cancel(&TimerKey::new(user_id, purpose));
    }

    fn disarm_all_timers(&self, user_id: UserId) {
        for purpose in TimerPurpose::ALL {
            self.disarm_timer(user_id, purpose);
        }
    }
}

#[async_trait]
impl SubscriptionCommands for LifecycleEngine {
    async fn start_onboarding(
        &self,
        user_id: UserId,
        username: String,
    ) -> Result<StartOutcome, LifecycleError> {
        LifecycleEngine::start_onboarding(self, user_id, username).await
    }

    async fn confirm_disclaimer(
        &self,
        user_id: UserId,
        text: &str,
    ) -> Result<ConfirmationOutcome, LifecycleError> {
        LifecycleEngine::confirm_disclaimer(self, user_id, text).await
    }

    async fn apply_payment(&self, event: PaymentEvent) -> Result<PaymentOutcome, LifecycleError> {
        LifecycleEngine::apply_payment(self, event).await
    }

    async fn send_help(&self, user_id: UserId) {
        let text = self.messages.help();
        self.notify(user_id, &text).await;
    }

    async fn acknowledge_cancel(&self, user_id: UserId) {
        let text = self.messages.cancel_acknowledged();
        self.notify(user_id, &text).await;
    }

    async fn apologise(&self, user_id: UserId) {
        let text = self.messages.apology();
        self.notify(user_id, &text).await;
    }
}
