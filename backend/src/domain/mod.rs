//! Domain model, ports, and the subscription lifecycle engine.
//!
//! Public surface:
//! - [`SubscriptionRecord`] and [`LifecycleStage`]: per-user state and its
//!   derived stage.
//! - [`TimerKey`] and [`TimerFired`]: identifiers for deferred actions.
//! - [`lifecycle::LifecycleEngine`]: owns every transition.
//! - [`Error`] and [`ErrorCode`]: transport-agnostic failures.

pub mod error;
pub mod lifecycle;
pub mod ports;
pub mod subscription;
pub mod timers;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::subscription::{
    DisclaimerStatus, EmailAddress, EmailValidationError, LifecycleStage, PaymentStatus,
    SubscriptionRecord, SubscriptionRecordParts, UnknownStatusError, UserId,
};
pub use self::timers::{TimerFired, TimerHandle, TimerKey, TimerKeyParseError, TimerPurpose};

/// Result alias for inbound adapters.
///
/// # Examples
/// ```
/// use subscription_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::unauthorized("secret mismatch"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
