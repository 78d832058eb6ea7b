//! Per-user deferred action identifiers.
//!
//! A timer is addressed by `(user, purpose)`; at most one may be pending for
//! any key. When it fires, the registry hands a [`TimerFired`] command back to
//! the engine carrying only identifiers, never a record snapshot.

use std::fmt;
use std::str::FromStr;

use super::subscription::UserId;

/// What a pending timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerPurpose {
    /// Warn a user who has not confirmed the disclaimer.
    DisclaimerWarning,
    /// Cancel onboarding for a warned user who still has not confirmed.
    FinalCancel,
}

impl TimerPurpose {
    pub const ALL: [Self; 2] = [Self::DisclaimerWarning, Self::FinalCancel];

    const fn prefix(self) -> &'static str {
        match self {
            Self::DisclaimerWarning => "disclaimer_warning",
            Self::FinalCancel => "cancel_request",
        }
    }
}

/// Unique identifier for a pending timer.
///
/// # Examples
/// ```
/// use subscription_backend::domain::{TimerKey, TimerPurpose, UserId};
///
/// let key = TimerKey::new(UserId::new(42), TimerPurpose::FinalCancel);
/// assert_eq!(key.to_string(), "cancel_request_42");
/// assert_eq!("cancel_request_42".parse::<TimerKey>(), Ok(key));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub user_id: UserId,
    pub purpose: TimerPurpose,
}

impl TimerKey {
    pub const fn new(user_id: UserId, purpose: TimerPurpose) -> Self {
        Self { user_id, purpose }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.purpose.prefix(), self.user_id)
    }
}

/// Error returned for strings that are not timer keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a timer key")]
pub struct TimerKeyParseError(pub String);

impl FromStr for TimerKey {
    type Err = TimerKeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TimerPurpose::ALL
            .into_iter()
            .find_map(|purpose| {
                let rest = value.strip_prefix(purpose.prefix())?.strip_prefix('_')?;
                let id = rest.parse::<i64>().ok()?;
                Some(Self::new(UserId::new(id), purpose))
            })
            .ok_or_else(|| TimerKeyParseError(value.to_owned()))
    }
}

/// Receipt for a scheduled timer.
///
/// The generation distinguishes a replacement from the timer it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub key: TimerKey,
    pub generation: u64,
}

/// Command delivered to the engine when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub key: TimerKey,
}

impl TimerFired {
    pub const fn user_id(&self) -> UserId {
        self.key.user_id
    }

    pub const fn purpose(&self) -> TimerPurpose {
        self.key.purpose
    }
}
