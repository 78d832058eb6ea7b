//! Driving port for chat and payment inbound adapters.
//!
//! Adapters translate transport payloads into these commands and render the
//! returned outcomes; all lifecycle rules live behind the port.
use async_trait::async_trait;

use crate::domain::lifecycle::{
    ConfirmationOutcome, LifecycleError, PaymentEvent, PaymentOutcome, StartOutcome,
};
use crate::domain::subscription::UserId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionCommands: Send + Sync {
    /// Begin (or restart) onboarding for a user who sent `/start`.
    async fn start_onboarding(
        &self,
        user_id: UserId,
        username: String,
    ) -> Result<StartOutcome, LifecycleError>;

    /// Handle a free-text reply that may confirm the disclaimer.
    async fn confirm_disclaimer(
        &self,
        user_id: UserId,
        text: &str,
    ) -> Result<ConfirmationOutcome, LifecycleError>;

    /// Reconcile a payment provider notification.
    async fn apply_payment(&self, event: PaymentEvent) -> Result<PaymentOutcome, LifecycleError>;

    /// Reply to `/help`.
    async fn send_help(&self, user_id: UserId);

    /// Reply to `/cancel`.
    async fn acknowledge_cancel(&self, user_id: UserId);

    /// Tell the user something went wrong on our side.
    async fn apologise(&self, user_id: UserId);
}
