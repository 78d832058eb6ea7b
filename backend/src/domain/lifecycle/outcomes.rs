//! Commands and results exchanged with inbound adapters.

use chrono::{DateTime, Utc};

use super::confirmation::ConfirmationRejection;
use crate::domain::subscription::{LifecycleStage, UserId};

/// Payment provider notification after transport decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    /// Buyer email exactly as the provider sent it.
    pub email: String,
    pub sale_id: String,
    pub subscription_id: Option<String>,
    pub product_id: Option<String>,
    /// The provider reports the subscription as cancelled.
    pub cancelled: bool,
}

/// Result of `/start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A disclaimer was sent and the warning timer armed.
    DisclaimerSent,
    /// The user already has access; a fresh invite was offered.
    AccessReissued { stage: LifecycleStage },
}

/// Result of a free-text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    TrialStarted { trial_end: DateTime<Utc> },
    /// No record exists for the user.
    NotOnboarded,
    /// The user is not waiting for a confirmation.
    NotAwaiting { stage: LifecycleStage },
    Rejected(ConfirmationRejection),
    /// Another user already registered the address.
    EmailInUse,
}

/// Result of handling a fired timer or a sweep action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Applied { stage: LifecycleStage },
    /// The record had already moved on; nothing was done.
    Skipped { stage: LifecycleStage },
    RecordMissing,
}

/// Result of reconciling a payment notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Activated { user_id: UserId },
    /// An expired user paid late; access returns on their next `/start`.
    Reinstated { user_id: UserId },
    /// Already paid; a new sale id was recorded.
    Renewed { user_id: UserId },
    /// Already paid with the same sale id.
    Duplicate { user_id: UserId },
    Cancelled { user_id: UserId },
    /// The matching record is in a stage that does not accept the event.
    IgnoredStage { user_id: UserId, stage: LifecycleStage },
    WrongProduct,
    /// No record holds the address.
    Unmatched,
}

impl PaymentOutcome {
    /// Short label reported back to the provider.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Activated { .. } => "activated",
            Self::Reinstated { .. } => "reinstated",
            Self::Renewed { .. } => "renewed",
            Self::Duplicate { .. } => "duplicate",
            Self::Cancelled { .. } => "cancelled",
            Self::IgnoredStage { .. } => "ignored_stage",
            Self::WrongProduct => "ignored_product",
            Self::Unmatched => "unmatched",
        }
    }
}

/// Counters for one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub warned: usize,
    pub cancelled: usize,
    pub reminded: usize,
    pub removed: usize,
    pub failed: usize,
}
