//! Tunable lifecycle durations and texts.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

/// Default trial length in days.
pub const DEFAULT_TRIAL_DAYS: u32 = 7;
/// Default delay before an unconfirmed user is warned.
pub const DEFAULT_DISCLAIMER_WARNING: Duration = Duration::from_secs(24 * 60 * 60);
/// Default window after the warning before onboarding is cancelled.
pub const DEFAULT_FINAL_CANCEL: Duration = Duration::from_secs(4 * 60 * 60);
/// Default time past trial end before an unpaid user is removed.
pub const DEFAULT_PAYMENT_GRACE: Duration = Duration::from_secs(28 * 60 * 60);
/// How long before trial end the payment reminder goes out.
pub const DEFAULT_REMINDER_LEAD: Duration = Duration::from_secs(24 * 60 * 60);
/// Lifetime of a trial invite link.
pub const DEFAULT_INVITE_VALIDITY: Duration = Duration::from_secs(8 * 24 * 60 * 60);
/// Word users append to their email to accept the disclaimer.
pub const DEFAULT_CONFIRMATION_KEYWORD: &str = "מאשר";

/// Lifecycle policy shared by every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub trial_period_days: u32,
    pub disclaimer_warning_delay: Duration,
    pub final_cancel_delay: Duration,
    pub payment_grace: Duration,
    pub reminder_lead: Duration,
    pub invite_link_validity: Duration,
    pub confirmation_keyword: String,
    /// Product id a payment must carry to be applied.
    pub expected_product_id: String,
    pub channel_name: String,
    pub payment_link: Option<String>,
    /// UTC time of day for the daily sweep.
    pub sweep_time: NaiveTime,
}

impl LifecycleConfig {
    /// Defaults for everything except the product the payments must match.
    pub fn new(expected_product_id: impl Into<String>) -> Self {
        Self {
            trial_period_days: DEFAULT_TRIAL_DAYS,
            disclaimer_warning_delay: DEFAULT_DISCLAIMER_WARNING,
            final_cancel_delay: DEFAULT_FINAL_CANCEL,
            payment_grace: DEFAULT_PAYMENT_GRACE,
            reminder_lead: DEFAULT_REMINDER_LEAD,
            invite_link_validity: DEFAULT_INVITE_VALIDITY,
            confirmation_keyword: DEFAULT_CONFIRMATION_KEYWORD.to_owned(),
            expected_product_id: expected_product_id.into(),
            channel_name: "the channel".to_owned(),
            payment_link: None,
            sweep_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn trial_length(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.trial_period_days))
    }
}

/// `ts + d`, saturating at the far end of the calendar.
pub(crate) fn after(ts: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(d)
        .ok()
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `ts - d`, saturating at the near end of the calendar.
pub(crate) fn before(ts: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(d)
        .ok()
        .and_then(|delta| ts.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Time left until `deadline`, zero when it has passed.
pub(crate) fn remaining(now: DateTime<Utc>, deadline: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn defaults_follow_the_documented_policy() {
        let config = LifecycleConfig::new("prod-1");
        assert_eq!(config.trial_length(), TimeDelta::days(7));
        assert_eq!(config.payment_grace, Duration::from_secs(28 * 3600));
        assert_eq!(config.sweep_time, NaiveTime::from_hms_opt(9, 0, 0).expect("time"));
        assert_eq!(config.confirmation_keyword, "מאשר");
    }

    #[rstest]
    fn remaining_is_zero_once_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).single().expect("ts");
        let deadline = now - TimeDelta::hours(1);
        assert_eq!(remaining(now, deadline), Duration::ZERO);
        assert_eq!(remaining(deadline, now), Duration::from_secs(3600));
    }

    #[rstest]
    fn after_saturates() {
        let far = DateTime::<Utc>::MAX_UTC - TimeDelta::seconds(1);
        assert_eq!(after(far, Duration::from_secs(10)), DateTime::<Utc>::MAX_UTC);
    }
}
