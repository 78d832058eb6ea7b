//! Lifecycle transition table.
//!
//! Every handler asks [`decide`] whether its trigger is legal for the stage
//! it has just re-read from the store. Stale or repeated triggers come back
//! as [`Decision::Reject`] and the handler does nothing.

use crate::domain::subscription::LifecycleStage;

/// Event that may move a user between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    StartOnboarding,
    ConfirmDisclaimer,
    DisclaimerWarningDue,
    FinalCancelDue,
    TrialEndingSoon,
    GraceElapsed,
    PaymentReceived,
    SubscriptionCancelled,
}

/// Outcome of consulting the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the trigger's effects and move to the given stage.
    Advance(LifecycleStage),
    /// The trigger is valid but the stage does not change.
    Stay,
    /// The trigger does not apply to this stage.
    Reject,
}

/// Look up the transition for `trigger` in `current`.
pub fn decide(current: LifecycleStage, trigger: Trigger) -> Decision {
    use Decision::{Advance, Reject, Stay};
    use LifecycleStage as S;

    match trigger {
        Trigger::StartOnboarding => match current {
            S::New
            | S::AwaitingDisclaimer
            | S::WarnedNoResponse
            | S::CancelledNoResponse
            | S::ExpiredNoPayment
            | S::CancelledByUser => Advance(S::AwaitingDisclaimer),
            S::TrialActive | S::PendingPaymentAfterTrial | S::PaidSubscriber => Stay,
        },
        Trigger::ConfirmDisclaimer => match current {
            S::AwaitingDisclaimer | S::WarnedNoResponse => Advance(S::TrialActive),
            S::New
            | S::CancelledNoResponse
            | S::TrialActive
            | S::PendingPaymentAfterTrial
            | S::PaidSubscriber
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
        Trigger::DisclaimerWarningDue => match current {
            S::AwaitingDisclaimer => Advance(S::WarnedNoResponse),
            S::New
            | S::WarnedNoResponse
            | S::CancelledNoResponse
            | S::TrialActive
            | S::PendingPaymentAfterTrial
            | S::PaidSubscriber
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
        Trigger::FinalCancelDue => match current {
            S::WarnedNoResponse => Advance(S::CancelledNoResponse),
            S::New
            | S::AwaitingDisclaimer
            | S::CancelledNoResponse
            | S::TrialActive
            | S::PendingPaymentAfterTrial
            | S::PaidSubscriber
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
        Trigger::TrialEndingSoon => match current {
            S::TrialActive => Advance(S::PendingPaymentAfterTrial),
            S::New
            | S::AwaitingDisclaimer
            | S::WarnedNoResponse
            | S::CancelledNoResponse
            | S::PendingPaymentAfterTrial
            | S::PaidSubscriber
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
        Trigger::GraceElapsed => match current {
            S::PendingPaymentAfterTrial => Advance(S::ExpiredNoPayment),
            S::New
            | S::AwaitingDisclaimer
            | S::WarnedNoResponse
            | S::CancelledNoResponse
            | S::TrialActive
            | S::PaidSubscriber
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
        Trigger::PaymentReceived => match current {
            S::AwaitingDisclaimer
            | S::WarnedNoResponse
            | S::TrialActive
            | S::PendingPaymentAfterTrial
            | S::ExpiredNoPayment => Advance(S::PaidSubscriber),
            S::PaidSubscriber => Stay,
            S::New | S::CancelledNoResponse | S::CancelledByUser => Reject,
        },
        Trigger::SubscriptionCancelled => match current {
            S::PaidSubscriber => Advance(S::CancelledByUser),
            S::New
            | S::AwaitingDisclaimer
            | S::WarnedNoResponse
            | S::CancelledNoResponse
            | S::TrialActive
            | S::PendingPaymentAfterTrial
            | S::ExpiredNoPayment
            | S::CancelledByUser => Reject,
        },
    }
}
