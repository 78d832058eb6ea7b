//! Payment reconciliation.
//!
//! Notifications are matched to a user by email. A payment moves any
//! non-terminal user to paid; a cancellation removes a paid user. Repeated
//! deliveries only re-set the same values. A late payment from a user whose
//! trial expired is recorded, but no invite is sent automatically: the user
//! asks for one with `/start`. Payments for cancelled records are logged and
//! dropped.

use tracing::{info, warn};

use super::outcomes::{PaymentEvent, PaymentOutcome};
use super::removal::RemovalReason;
use super::transitions::{Decision, Trigger, decide};
use super::{LifecycleEngine, LifecycleError};
use crate::domain::subscription::{EmailAddress, LifecycleStage};

impl LifecycleEngine {
    /// Reconcile one payment provider notification.
    pub async fn apply_payment(&self, event: PaymentEvent) -> Result<PaymentOutcome, LifecycleError> {
        if event.product_id.as_deref() != Some(self.config.expected_product_id.as_str()) {
            info!(
                sale_id = %event.sale_id,
                product_id = event.product_id.as_deref().unwrap_or("<missing>"),
                "payment for another product ignored"
            );
            return Ok(PaymentOutcome::WrongProduct);
        }

        let email = match EmailAddress::parse(&event.email) {
            Ok(email) => email,
            Err(error) => {
                warn!(sale_id = %event.sale_id, error = %error, "payment carries an unusable email");
                return Ok(PaymentOutcome::Unmatched);
            }
        };

        let Some(candidate) = self.store.find_by_email(&email).await? else {
            warn!(sale_id = %event.sale_id, "payment email matches no subscriber");
            return Ok(PaymentOutcome::Unmatched);
        };
        let user_id = candidate.user_id();

        let _guard = self.locks.acquire(user_id).await;
        // Re-read under the lock; the email may have moved since the lookup.
        let Some(mut record) = self.store.get(user_id).await? else {
            return Ok(PaymentOutcome::Unmatched);
        };
        if record.email() != Some(&email) {
            warn!(user_id = %user_id, sale_id = %event.sale_id, "payment email changed during lookup");
            return Ok(PaymentOutcome::Unmatched);
        }

        let stage = record.stage();
        let trigger = if event.cancelled {
            Trigger::SubscriptionCancelled
        } else {
            Trigger::PaymentReceived
        };
        let now = self.clock.utc();

        match (trigger, decide(stage, trigger)) {
            (Trigger::SubscriptionCancelled, Decision::Advance(_)) => {
                self.remove_from_channel(&mut record, RemovalReason::SubscriptionCancelled)
                    .await;
                self.store.upsert(&record).await?;
                Ok(PaymentOutcome::Cancelled { user_id })
            }
            (_, Decision::Advance(_)) => {
                record.mark_paid(event.sale_id.clone(), event.subscription_id, now);
                self.store.upsert(&record).await?;
                self.disarm_all_timers(user_id);

                let removed = stage == LifecycleStage::ExpiredNoPayment;
                let text = if removed {
                    self.messages.payment_after_removal()
                } else {
                    self.messages.payment_confirmed()
                };
                self.notify(user_id, &text).await;
                info!(user_id = %user_id, sale_id = %event.sale_id, previous = %stage, "subscription activated");
                if removed {
                    Ok(PaymentOutcome::Reinstated { user_id })
                } else {
                    Ok(PaymentOutcome::Activated { user_id })
                }
            }
            (_, Decision::Stay) => {
                let duplicate = record.external_sale_id() == Some(event.sale_id.as_str());
                record.mark_paid(event.sale_id.clone(), event.subscription_id, now);
                self.store.upsert(&record).await?;
                if duplicate {
                    info!(user_id = %user_id, sale_id = %event.sale_id, "duplicate payment notification");
                    Ok(PaymentOutcome::Duplicate { user_id })
                } else {
                    info!(user_id = %user_id, sale_id = %event.sale_id, "subscription renewed");
                    Ok(PaymentOutcome::Renewed { user_id })
                }
            }
            (_, Decision::Reject) => {
                warn!(
                    user_id = %user_id,
                    sale_id = %event.sale_id,
                    stage = %stage,
                    cancelled = event.cancelled,
                    "payment notification does not apply to current stage"
                );
                Ok(PaymentOutcome::IgnoredStage { user_id, stage })
            }
        }
    }
}
