//! User-facing texts sent over the chat platform.

use chrono::{DateTime, Utc};

use super::config::LifecycleConfig;
use super::confirmation::ConfirmationRejection;
use crate::domain::subscription::LifecycleStage;

/// Renders every message the engine sends.
#[derive(Debug, Clone)]
pub(crate) struct MessageCatalogue {
    channel_name: String,
    keyword: String,
    trial_days: u32,
    final_cancel_hours: u64,
    payment_link: Option<String>,
}

const DATE_FORMAT: &str = "%d/%m/%Y";

impl MessageCatalogue {
    pub(crate) fn new(config: &LifecycleConfig) -> Self {
        Self {
            channel_name: config.channel_name.clone(),
            keyword: config.confirmation_keyword.clone(),
            trial_days: config.trial_period_days,
            final_cancel_hours: config.final_cancel_delay.as_secs() / 3600,
            payment_link: config.payment_link.clone(),
        }
    }

    fn format_example(&self) -> String {
        format!("your-email@example.com {}", self.keyword)
    }

    fn payment_line(&self) -> String {
        match &self.payment_link {
            Some(link) => format!("Subscribe here: {link}"),
            None => "Reply to this chat and we will send you a payment link.".to_owned(),
        }
    }

    pub(crate) fn disclaimer(&self, username: &str) -> String {
        format!(
            "Hello {username}! Welcome to {channel}.\n\n\
             Disclaimer: everything shared in the channel is for education only. \
             It is not investment advice, and you carry full responsibility for \
             your own decisions.\n\n\
             Free trial: {days} days.\n\n\
             To continue, reply with your email address followed by the word \
             \"{keyword}\", for example:\n{example}\n\n\
             Use the same email address when you pay later.",
            channel = self.channel_name,
            days = self.trial_days,
            keyword = self.keyword,
            example = self.format_example(),
        )
    }

    pub(crate) fn rejected_reply(&self, rejection: &ConfirmationRejection) -> String {
        match rejection {
            ConfirmationRejection::MissingKeyword | ConfirmationRejection::MissingEmail => format!(
                "Please send your email in this format:\n{}",
                self.format_example()
            ),
            ConfirmationRejection::InvalidEmail(_) => format!(
                "That email address does not look valid. Please try again:\n{}",
                self.format_example()
            ),
        }
    }

    pub(crate) fn email_in_use(&self) -> String {
        "That email address is already registered to another account. \
         Please use a different address or contact support."
            .to_owned()
    }

    pub(crate) fn trial_welcome(
        &self,
        invite_url: Option<&str>,
        trial_start: DateTime<Utc>,
        trial_end: DateTime<Utc>,
    ) -> String {
        let link = match invite_url {
            Some(url) => format!("Your personal invite link:\n{url}"),
            None => "We could not create your invite link right now. \
                     Send /start again in a few minutes to get it."
                .to_owned(),
        };
        format!(
            "Welcome to {channel}!\n\n{link}\n\n\
             Trial: {days} days, from {start} until {end}.\n\
             Before the trial ends you will get a message with the option to \
             continue as a paying member.",
            channel = self.channel_name,
            days = self.trial_days,
            start = trial_start.format(DATE_FORMAT),
            end = trial_end.format(DATE_FORMAT),
        )
    }

    pub(crate) fn access_reissued(&self, stage: LifecycleStage, invite_url: Option<&str>) -> String {
        let status = match stage {
            LifecycleStage::PaidSubscriber => "Your subscription is active.",
            _ => "Your trial is active.",
        };
        match invite_url {
            Some(url) => format!("{status} Here is a fresh invite link:\n{url}"),
            None => format!("{status} We could not create a new invite link right now."),
        }
    }

    pub(crate) fn not_onboarded(&self) -> String {
        "Send /start to begin.".to_owned()
    }

    pub(crate) fn not_awaiting(&self, stage: LifecycleStage) -> String {
        if stage.has_channel_access() {
            "Your email is already confirmed. Send /start if you need a new invite link.".to_owned()
        } else {
            "This registration has ended. Send /start to begin again.".to_owned()
        }
    }

    pub(crate) fn disclaimer_warning(&self) -> String {
        format!(
            "Reminder: we have not received your confirmation yet.\n\
             Reply within {hours} hours with:\n{example}\n\n\
             Otherwise your registration will be cancelled.",
            hours = self.final_cancel_hours,
            example = self.format_example(),
        )
    }

    pub(crate) fn disclaimer_cancelled(&self) -> String {
        "Your registration was cancelled because the disclaimer was not confirmed. \
         Send /start whenever you want to try again."
            .to_owned()
    }

    pub(crate) fn trial_reminder(&self) -> String {
        format!(
            "Your {channel} trial ends tomorrow.\n\n\
             To keep your access, subscribe before it ends.\n{payment}\n\n\
             Important: pay with the same email address you registered with.",
            channel = self.channel_name,
            payment = self.payment_line(),
        )
    }

    pub(crate) fn removed_unpaid(&self) -> String {
        format!(
            "Your {channel} trial has ended and we did not receive a payment, \
             so your access was removed.\n{payment}",
            channel = self.channel_name,
            payment = self.payment_line(),
        )
    }

    pub(crate) fn removed_cancelled(&self) -> String {
        format!(
            "Your {channel} subscription was cancelled and your access was removed. \
             Send /start if you ever want to come back.",
            channel = self.channel_name,
        )
    }

    pub(crate) fn payment_confirmed(&self) -> String {
        format!(
            "Payment received, thank you! You are now a full member of {}.",
            self.channel_name
        )
    }

    pub(crate) fn payment_after_removal(&self) -> String {
        format!(
            "Payment received, thank you! Your access to {} was removed before it arrived. \
             Send /start to get a fresh invite link.",
            self.channel_name
        )
    }

    pub(crate) fn help(&self) -> String {
        format!(
            "Commands:\n/start - begin registration\n/help - show this message\n\
             /cancel - stop the current registration step\n\n\
             How to join:\n1. Send /start\n2. Read the disclaimer\n\
             3. Reply with your email followed by \"{keyword}\"\n\
             4. Use the invite link you receive\n\n\
             Free trial: {days} days.",
            keyword = self.keyword,
            days = self.trial_days,
        )
    }

    pub(crate) fn cancel_acknowledged(&self) -> String {
        "Okay, nothing more is needed for now. Send /start whenever you are ready.".to_owned()
    }

    pub(crate) fn apology(&self) -> String {
        "Something went wrong on our side. Please try again in a few minutes.".to_owned()
    }
}
