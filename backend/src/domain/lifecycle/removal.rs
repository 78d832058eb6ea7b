//! Channel removal workflow.
//!
//! Removal bans then immediately unbans the user, which kicks them from the
//! channel while leaving them free to rejoin after a new payment. Platform
//! failures are logged and never block the terminal status: a user the
//! platform refused to kick is still recorded as removed.

use tracing::{info, warn};

use super::LifecycleEngine;
use crate::domain::subscription::{SubscriptionRecord, UserId};

/// Why a user is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RemovalReason {
    TrialUnpaid,
    SubscriptionCancelled,
}

impl RemovalReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::TrialUnpaid => "trial_unpaid",
            Self::SubscriptionCancelled => "subscription_cancelled",
        }
    }
}

impl LifecycleEngine {
    /// Kick the user, tell them, and set the terminal status on `record`.
    ///
    /// The caller holds the user's lock and persists the record.
    pub(super) async fn remove_from_channel(
        &self,
        record: &mut SubscriptionRecord,
        reason: RemovalReason,
    ) {
        let user_id = record.user_id();
        let kicked = self.kick(user_id).await;

        let text = match reason {
            RemovalReason::TrialUnpaid => self.messages.removed_unpaid(),
            RemovalReason::SubscriptionCancelled => self.messages.removed_cancelled(),
        };
        self.notify(user_id, &text).await;

        let now = self.clock.utc();
        match reason {
            RemovalReason::TrialUnpaid => record.mark_expired(now),
            RemovalReason::SubscriptionCancelled => record.mark_cancelled_by_user(now),
        }
        self.disarm_all_timers(user_id);
        info!(user_id = %user_id, reason = reason.as_str(), kicked, "user removed from channel");
    }

    async fn kick(&self, user_id: UserId) -> bool {
        let banned = match self.notifier.ban_member(user_id).await {
            Ok(()) => true,
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "failed to ban member");
                false
            }
        };
        let unbanned = match self.notifier.unban_member(user_id).await {
            Ok(()) => true,
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "failed to unban member");
                false
            }
        };
        banned && unbanned
    }
}
