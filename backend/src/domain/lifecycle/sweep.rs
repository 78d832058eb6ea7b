//! Daily reconciliation sweep and timer rehydration.
//!
//! The sweep is the source of truth for time-based transitions. It sends
//! payment reminders, removes unpaid users after the grace period, and
//! catches up disclaimer warnings and cancellations whose timers were lost.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::config::{LifecycleConfig, after, before, remaining};
use super::outcomes::{SweepReport, TimerOutcome};
use super::removal::RemovalReason;
use super::transitions::{Decision, Trigger, decide};
use super::{LifecycleEngine, LifecycleError};
use crate::domain::subscription::{LifecycleStage, SubscriptionRecord, UserId};
use crate::domain::timers::TimerPurpose;

/// Time-based action due for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    WarnDisclaimer,
    CancelDisclaimer,
    RemindTrialEnding,
    RemoveUnpaid,
}

/// The action due for `record` at `now`, if any.
pub fn due_action(
    record: &SubscriptionRecord,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> Option<SweepAction> {
    match record.stage() {
        LifecycleStage::AwaitingDisclaimer => {
            let warn_at = after(record.disclaimer_sent_at(), config.disclaimer_warning_delay);
            (now >= warn_at).then_some(SweepAction::WarnDisclaimer)
        }
        LifecycleStage::WarnedNoResponse => {
            (now >= final_cancel_at(record, config)).then_some(SweepAction::CancelDisclaimer)
        }
        LifecycleStage::TrialActive => {
            let end = record.trial_end()?;
            (now >= before(end, config.reminder_lead)).then_some(SweepAction::RemindTrialEnding)
        }
        LifecycleStage::PendingPaymentAfterTrial => {
            let end = record.trial_end()?;
            (now >= after(end, config.payment_grace)).then_some(SweepAction::RemoveUnpaid)
        }
        LifecycleStage::New
        | LifecycleStage::CancelledNoResponse
        | LifecycleStage::PaidSubscriber
        | LifecycleStage::ExpiredNoPayment
        | LifecycleStage::CancelledByUser => None,
    }
}

/// When a warned user's onboarding is cancelled.
///
/// Normally `sent + warning + final window`. A warning delivered late (after
/// downtime) still leaves the user the full final window, measured from the
/// stored warning time. Rows written before that column existed fall back to
/// `last_update`.
fn final_cancel_at(record: &SubscriptionRecord, config: &LifecycleConfig) -> DateTime<Utc> {
    let scheduled = after(
        after(record.disclaimer_sent_at(), config.disclaimer_warning_delay),
        config.final_cancel_delay,
    );
    let warned = record.warned_at().unwrap_or_else(|| record.last_update());
    scheduled.max(after(warned, config.final_cancel_delay))
}

impl LifecycleEngine {
    /// Scan every open record and apply whatever is due.
    ///
    /// A failure on one record is logged and counted; the sweep moves on.
    /// Only failing to list the records aborts the run.
    pub async fn run_sweep(&self) -> Result<SweepReport, LifecycleError> {
        let records = self.store.list_open().await?;
        let now = self.clock.utc();
        let mut report = SweepReport {
            examined: records.len(),
            ..SweepReport::default()
        };

        for snapshot in records {
            let Some(action) = due_action(&snapshot, now, &self.config) else {
                continue;
            };
            let user_id = snapshot.user_id();
            match self.apply_sweep_action(user_id, action).await {
                Ok(TimerOutcome::Applied { .. }) => match action {
                    SweepAction::WarnDisclaimer => report.warned += 1,
                    SweepAction::CancelDisclaimer => report.cancelled += 1,
                    SweepAction::RemindTrialEnding => report.reminded += 1,
                    SweepAction::RemoveUnpaid => report.removed += 1,
                },
                Ok(TimerOutcome::Skipped { .. } | TimerOutcome::RecordMissing) => {}
                Err(err) => {
                    report.failed += 1;
                    error!(user_id = %user_id, error = %err, "sweep failed for record");
                }
            }
        }

        info!(
            examined = report.examined,
            warned = report.warned,
            cancelled = report.cancelled,
            reminded = report.reminded,
            removed = report.removed,
            failed = report.failed,
            "daily sweep finished"
        );
        Ok(report)
    }

    async fn apply_sweep_action(
        &self,
        user_id: UserId,
        action: SweepAction,
    ) -> Result<TimerOutcome, LifecycleError> {
        match action {
            SweepAction::WarnDisclaimer => self.warn_unconfirmed(user_id).await,
            SweepAction::CancelDisclaimer => self.cancel_unconfirmed(user_id).await,
            SweepAction::RemindTrialEnding => self.remind_trial_ending(user_id).await,
            SweepAction::RemoveUnpaid => self.remove_unpaid(user_id).await,
        }
    }

    async fn remind_trial_ending(&self, user_id: UserId) -> Result<TimerOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut record) = self.store.get(user_id).await? else {
            return Ok(TimerOutcome::RecordMissing);
        };
        let now = self.clock.utc();
        let stage = record.stage();
        // Re-check both the stage and the clock against the fresh record.
        let due = due_action(&record, now, &self.config) == Some(SweepAction::RemindTrialEnding);
        let Decision::Advance(next) = decide(stage, Trigger::TrialEndingSoon) else {
            return Ok(TimerOutcome::Skipped { stage });
        };
        if !due {
            return Ok(TimerOutcome::Skipped { stage });
        }

        record.mark_pending_payment(now);
        self.store.upsert(&record).await?;

        let text = self.messages.trial_reminder();
        self.notify(user_id, &text).await;
        info!(user_id = %user_id, "payment reminder sent");
        Ok(TimerOutcome::Applied { stage: next })
    }

    async fn remove_unpaid(&self, user_id: UserId) -> Result<TimerOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut record) = self.store.get(user_id).await? else {
            return Ok(TimerOutcome::RecordMissing);
        };
        let now = self.clock.utc();
        let stage = record.stage();
        let due = due_action(&record, now, &self.config) == Some(SweepAction::RemoveUnpaid);
        let Decision::Advance(next) = decide(stage, Trigger::GraceElapsed) else {
            return Ok(TimerOutcome::Skipped { stage });
        };
        if !due {
            return Ok(TimerOutcome::Skipped { stage });
        }

        self.remove_from_channel(&mut record, RemovalReason::TrialUnpaid)
            .await;
        self.store.upsert(&record).await?;
        Ok(TimerOutcome::Applied { stage: next })
    }

    /// Re-arm disclaimer timers for records left mid-onboarding by a restart.
    ///
    /// Overdue steps get a zero delay so they fire straight away.
    pub async fn rehydrate_timers(&self) -> Result<usize, LifecycleError> {
        let records = self.store.list_open().await?;
        let now = self.clock.utc();
        let mut armed = 0;
        for record in records {
            let pending: Option<(TimerPurpose, Duration)> = match record.stage() {
                LifecycleStage::AwaitingDisclaimer => {
                    let warn_at = after(
                        record.disclaimer_sent_at(),
                        self.config.disclaimer_warning_delay,
                    );
                    Some((TimerPurpose::DisclaimerWarning, remaining(now, warn_at)))
                }
                LifecycleStage::WarnedNoResponse => {
                    let cancel_at = final_cancel_at(&record, &self.config);
                    Some((TimerPurpose::FinalCancel, remaining(now, cancel_at)))
                }
                LifecycleStage::New
                | LifecycleStage::CancelledNoResponse
                | LifecycleStage::TrialActive
                | LifecycleStage::PendingPaymentAfterTrial
                | LifecycleStage::PaidSubscriber
                | LifecycleStage::ExpiredNoPayment
                | LifecycleStage::CancelledByUser => None,
            };
            if let Some((purpose, delay)) = pending {
                self.arm_timer(record.user_id(), purpose, delay);
                armed += 1;
            }
        }
        info!(armed, "disclaimer timers rehydrated");
        Ok(armed)
    }
}
