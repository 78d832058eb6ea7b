//! Daily sweep scheduling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{error, info};

use super::config::remaining;
use super::outcomes::SweepReport;
use super::{LifecycleEngine, LifecycleError};

/// Async sleeping abstraction so scheduling can be tested without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// First instant strictly after `now` whose UTC time of day is `at`.
///
/// # Examples
/// ```
/// use chrono::{NaiveTime, TimeZone, Utc};
/// use subscription_backend::domain::lifecycle::next_sweep_after;
///
/// let at = NaiveTime::from_hms_opt(9, 0, 0).expect("time");
/// let now = Utc.with_ymd_and_hms(2026, 4, 1, 10, 30, 0).single().expect("ts");
/// let next = next_sweep_after(now, at);
/// assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).single().expect("ts"));
/// ```
pub fn next_sweep_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today
            .checked_add_signed(TimeDelta::days(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Runs the engine's sweep once a day at the configured time.
pub struct DailySweepScheduler {
    engine: Arc<LifecycleEngine>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    at: NaiveTime,
}

impl DailySweepScheduler {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let at = engine.config().sweep_time;
        Self {
            engine,
            clock,
            sleeper,
            at,
        }
    }

    /// Sleep until the next sweep time, then sweep once.
    pub async fn tick(&self) -> Result<SweepReport, LifecycleError> {
        let now = self.clock.utc();
        let next = next_sweep_after(now, self.at);
        info!(next_run = %next, "daily sweep scheduled");
        self.sleeper.sleep(remaining(now, next)).await;
        self.engine.run_sweep().await
    }

    /// Sweep every day until the task is aborted.
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                error!(error = %err, "daily sweep aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, h, m, 0).single().expect("ts")
    }

    #[rstest]
    #[case(ts(8, 59), ts(9, 0))]
    #[case(ts(0, 0), ts(9, 0))]
    fn runs_later_today_before_the_hour(#[case] now: DateTime<Utc>, #[case] expected: DateTime<Utc>) {
        let at = NaiveTime::from_hms_opt(9, 0, 0).expect("time");
        assert_eq!(next_sweep_after(now, at), expected);
    }

    #[rstest]
    #[case(ts(9, 0))]
    #[case(ts(23, 59))]
    fn runs_tomorrow_at_or_after_the_hour(#[case] now: DateTime<Utc>) {
        let at = NaiveTime::from_hms_opt(9, 0, 0).expect("time");
        let expected = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).single().expect("ts");
        assert_eq!(next_sweep_after(now, at), expected);
    }
}
