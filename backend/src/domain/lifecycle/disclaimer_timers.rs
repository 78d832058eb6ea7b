//! Handlers for fired disclaimer timers.
//!
//! The same handlers serve the daily sweep when a timer was lost, so a
//! duplicate fire after the sweep acted is a no-op. A fire that arrives
//! before the step is due (a timer that raced a restart) is skipped too.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::after;
use super::outcomes::TimerOutcome;
use super::sweep::{SweepAction, due_action};
use super::transitions::{Decision, Trigger, decide};
use super::{LifecycleEngine, LifecycleError};
use crate::domain::subscription::UserId;
use crate::domain::timers::{TimerFired, TimerPurpose};

/// Slack for timers that fire marginally before the stored deadline.
const FIRE_TOLERANCE: Duration = Duration::from_secs(60);

impl LifecycleEngine {
    /// Apply a fired timer to the user's current record.
    pub async fn handle_timer(&self, fired: TimerFired) -> Result<TimerOutcome, LifecycleError> {
        match fired.purpose() {
            TimerPurpose::DisclaimerWarning => self.warn_unconfirmed(fired.user_id()).await,
            TimerPurpose::FinalCancel => self.cancel_unconfirmed(fired.user_id()).await,
        }
    }

    pub(super) async fn warn_unconfirmed(
        &self,
        user_id: UserId,
    ) -> Result<TimerOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut record) = self.store.get(user_id).await? else {
            warn!(user_id = %user_id, "disclaimer warning for unknown user");
            return Ok(TimerOutcome::RecordMissing);
        };
        let stage = record.stage();
        let Decision::Advance(next) = decide(stage, Trigger::DisclaimerWarningDue) else {
            debug!(user_id = %user_id, stage = %stage, "disclaimer warning no longer applies");
            return Ok(TimerOutcome::Skipped { stage });
        };
        let horizon = after(self.clock.utc(), FIRE_TOLERANCE);
        if due_action(&record, horizon, &self.config) != Some(SweepAction::WarnDisclaimer) {
            debug!(user_id = %user_id, "disclaimer warning fired before it was due");
            return Ok(TimerOutcome::Skipped { stage });
        }

        record.mark_disclaimer_warned(self.clock.utc());
        self.store.upsert(&record).await?;

        self.arm_timer(
            user_id,
            TimerPurpose::FinalCancel,
            self.config.final_cancel_delay,
        );

        let text = self.messages.disclaimer_warning();
        self.notify(user_id, &text).await;
        info!(user_id = %user_id, "unconfirmed user warned");
        Ok(TimerOutcome::Applied { stage: next })
    }

    pub(super) async fn cancel_unconfirmed(
        &self,
        user_id: UserId,
    ) -> Result<TimerOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut record) = self.store.get(user_id).await? else {
            warn!(user_id = %user_id, "final cancel for unknown user");
            return Ok(TimerOutcome::RecordMissing);
        };
        let stage = record.stage();
        let Decision::Advance(next) = decide(stage, Trigger::FinalCancelDue) else {
            debug!(user_id = %user_id, stage = %stage, "final cancel no longer applies");
            return Ok(TimerOutcome::Skipped { stage });
        };
        let horizon = after(self.clock.utc(), FIRE_TOLERANCE);
        if due_action(&record, horizon, &self.config) != Some(SweepAction::CancelDisclaimer) {
            debug!(user_id = %user_id, "final cancel fired before it was due");
            return Ok(TimerOutcome::Skipped { stage });
        }

        record.mark_disclaimer_cancelled(self.clock.utc());
        self.store.upsert(&record).await?;

        self.disarm_all_timers(user_id);

        let text = self.messages.disclaimer_cancelled();
        self.notify(user_id, &text).await;
        info!(user_id = %user_id, "onboarding cancelled for unconfirmed user");
        Ok(TimerOutcome::Applied { stage: next })
    }
}
