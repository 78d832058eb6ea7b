//! `/start` and disclaimer confirmation handlers.

use tracing::{info, warn};

use super::config::after;
use super::confirmation::parse_confirmation;
use super::outcomes::{ConfirmationOutcome, StartOutcome};
use super::transitions::{Decision, Trigger, decide};
use super::{LifecycleEngine, LifecycleError};
use crate::domain::ports::InviteLinkRequest;
use crate::domain::subscription::{EmailAddress, LifecycleStage, SubscriptionRecord, UserId};
use crate::domain::timers::TimerPurpose;

impl LifecycleEngine {
    /// Begin onboarding, restart it from a terminal stage, or re-issue access
    /// for a user who already has it.
    pub async fn start_onboarding(
        &self,
        user_id: UserId,
        username: String,
    ) -> Result<StartOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let existing = self.store.get(user_id).await?;
        let stage = LifecycleStage::of(existing.as_ref());

        match decide(stage, Trigger::StartOnboarding) {
            Decision::Advance(_) => {
                let now = self.clock.utc();
                let record = match existing {
                    Some(mut record) => {
                        record.restart_onboarding(username, now);
                        record
                    }
                    None => SubscriptionRecord::new_pending(user_id, username, now),
                };
                self.store.upsert(&record).await?;

                self.disarm_all_timers(user_id);
                self.arm_timer(
                    user_id,
                    TimerPurpose::DisclaimerWarning,
                    self.config.disclaimer_warning_delay,
                );

                let text = self.messages.disclaimer(record.username());
                self.notify(user_id, &text).await;
                info!(user_id = %user_id, previous = %stage, "disclaimer sent");
                Ok(StartOutcome::DisclaimerSent)
            }
            Decision::Stay | Decision::Reject => {
                let invite = match existing.as_ref() {
                    Some(record) => self.issue_invite(record).await,
                    None => None,
                };
                let text = self.messages.access_reissued(stage, invite.as_deref());
                self.notify(user_id, &text).await;
                info!(user_id = %user_id, stage = %stage, "access re-issued");
                Ok(StartOutcome::AccessReissued { stage })
            }
        }
    }

    /// Accept a free-text reply as the disclaimer confirmation when it holds
    /// the keyword and a usable email address.
    pub async fn confirm_disclaimer(
        &self,
        user_id: UserId,
        text: &str,
    ) -> Result<ConfirmationOutcome, LifecycleError> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut record) = self.store.get(user_id).await? else {
            let reply = self.messages.not_onboarded();
            self.notify(user_id, &reply).await;
            return Ok(ConfirmationOutcome::NotOnboarded);
        };
        let stage = record.stage();

        if decide(stage, Trigger::ConfirmDisclaimer) == Decision::Reject {
            let reply = self.messages.not_awaiting(stage);
            self.notify(user_id, &reply).await;
            return Ok(ConfirmationOutcome::NotAwaiting { stage });
        }

        let email = match parse_confirmation(text, &self.config.confirmation_keyword) {
            Ok(email) => email,
            Err(rejection) => {
                let reply = self.messages.rejected_reply(&rejection);
                self.notify(user_id, &reply).await;
                return Ok(ConfirmationOutcome::Rejected(rejection));
            }
        };

        // Held until the record is written, so two users cannot both claim
        // the address.
        let _email_guard = self.email_locks.acquire(email.clone()).await;
        if self.email_taken_by_other(&email, user_id).await? {
            let reply = self.messages.email_in_use();
            self.notify(user_id, &reply).await;
            info!(user_id = %user_id, "confirmation rejected: email registered to another user");
            return Ok(ConfirmationOutcome::EmailInUse);
        }

        let now = self.clock.utc();
        record.confirm_disclaimer(email, now, self.config.trial_length());
        self.store.upsert(&record).await?;

        self.disarm_all_timers(user_id);

        let invite = self.issue_invite(&record).await;
        let trial_start = record.trial_start().unwrap_or(now);
        let trial_end = record.trial_end().unwrap_or(now);
        let reply = self
            .messages
            .trial_welcome(invite.as_deref(), trial_start, trial_end);
        self.notify(user_id, &reply).await;

        info!(user_id = %user_id, trial_end = %trial_end, "trial started");
        Ok(ConfirmationOutcome::TrialStarted { trial_end })
    }

    async fn email_taken_by_other(
        &self,
        email: &EmailAddress,
        user_id: UserId,
    ) -> Result<bool, LifecycleError> {
        let holder = self.store.find_by_email(email).await?;
        Ok(holder.is_some_and(|record| record.user_id() != user_id))
    }

    /// Create a single-use invite. Failures are logged and yield `None`.
    async fn issue_invite(&self, record: &SubscriptionRecord) -> Option<String> {
        let label = record.email().map_or("member", EmailAddress::local_part);
        let request = InviteLinkRequest {
            name: invite_name(record.user_id(), label),
            member_limit: 1,
            expires_at: after(self.clock.utc(), self.config.invite_link_validity),
        };
        match self.notifier.create_invite_link(&request).await {
            Ok(link) => Some(link.url),
            Err(error) => {
                warn!(user_id = %record.user_id(), error = %error, "failed to create invite link");
                None
            }
        }
    }
}

/// Invite label shown to channel admins. The platform caps names at 32
/// characters.
fn invite_name(user_id: UserId, label: &str) -> String {
    format!("Trial_{user_id}_{label}").chars().take(32).collect()
}

#[cfg(test)]
mod tests {
    use super::invite_name;
    use crate::domain::subscription::UserId;
    use rstest::rstest;

    #[rstest]
    #[case(42, "dana", "Trial_42_dana")]
    #[case(
        1_234_567_890,
        "a.very.long.local.part.indeed",
        "Trial_1234567890_a.very.long.loc"
    )]
    fn invite_names_are_capped(#[case] id: i64, #[case] label: &str, #[case] expected: &str) {
        let name = invite_name(UserId::new(id), label);
        assert_eq!(name, expected);
        assert!(name.chars().count() <= 32);
    }
}
