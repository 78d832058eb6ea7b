//! Subscription record and lifecycle stage model.
//!
//! A [`SubscriptionRecord`] holds one row per chat user. Its two status axes
//! (`disclaimer_status`, `payment_status`) are stored independently, while
//! [`LifecycleStage`] is the single derived state the engine dispatches on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Chat platform user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw platform identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored and sent to the platform.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Validation errors for [`EmailAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailValidationError {
    #[error("email address must not be empty")]
    Empty,
    #[error("email address must not contain whitespace")]
    ContainsWhitespace,
    #[error("email address must contain exactly one '@'")]
    MissingAt,
    #[error("email address is missing the part before '@'")]
    EmptyLocalPart,
    #[error("email domain must contain a '.' between labels")]
    InvalidDomain,
    #[error("email address must be at most {max} characters")]
    TooLong { max: usize },
}

/// Maximum accepted address length.
pub const EMAIL_MAX_LEN: usize = 254;

/// Lower-cased, syntactically plausible email address.
///
/// Addresses are normalised to lower case so payment notifications match
/// regardless of how the provider spells them.
///
/// # Examples
/// ```
/// use subscription_backend::domain::EmailAddress;
///
/// let email = EmailAddress::parse(" Dana@Example.com ").expect("valid");
/// assert_eq!(email.as_str(), "dana@example.com");
/// assert_eq!(email.local_part(), "dana");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an address.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, EmailValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmailValidationError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailValidationError::ContainsWhitespace);
        }
        if trimmed.chars().count() > EMAIL_MAX_LEN {
            return Err(EmailValidationError::TooLong { max: EMAIL_MAX_LEN });
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(EmailValidationError::MissingAt);
        };
        if domain.contains('@') {
            return Err(EmailValidationError::MissingAt);
        }
        if local.is_empty() {
            return Err(EmailValidationError::EmptyLocalPart);
        }
        let labels_ok = domain.contains('.') && domain.split('.').all(|label| !label.is_empty());
        if !labels_ok {
            return Err(EmailValidationError::InvalidDomain);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Portion before the `@`, used when naming invite links.
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = EmailValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status `{value}`")]
pub struct UnknownStatusError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! status_enum {
    (
        $(#[$outer:meta])*
        $name:ident, $kind:literal {
            $( $(#[$variant_meta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$variant_meta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Persisted text form.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatusError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(UnknownStatusError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

status_enum! {
    /// Disclaimer axis of a subscription record.
    DisclaimerStatus, "disclaimer" {
        PendingDisclaimer => "pending_disclaimer",
        Confirmed => "confirmed_disclaimer",
        WarnedNoResponse => "warned_no_disclaimer_approval",
        CancelledNoResponse => "cancelled_no_disclaimer_approval",
    }
}

status_enum! {
    /// Payment axis of a subscription record. Absent before the trial starts.
    PaymentStatus, "payment" {
        Trial => "trial",
        PendingPaymentAfterTrial => "pending_payment_after_trial",
        PaidSubscriber => "paid_subscriber",
        ExpiredNoPayment => "expired_no_payment",
        CancelledByUser => "cancelled_by_user",
    }
}

/// Derived lifecycle state of a user.
///
/// `New` stands for "no record exists yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    New,
    AwaitingDisclaimer,
    WarnedNoResponse,
    CancelledNoResponse,
    TrialActive,
    PendingPaymentAfterTrial,
    PaidSubscriber,
    ExpiredNoPayment,
    CancelledByUser,
}

impl LifecycleStage {
    /// Stage of an optional record.
    pub fn of(record: Option<&SubscriptionRecord>) -> Self {
        record.map_or(Self::New, SubscriptionRecord::stage)
    }

    /// Terminal stages receive no automatic transitions. They leave through a
    /// fresh `/start`, and an expired trial also through a late payment.
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::CancelledNoResponse | Self::ExpiredNoPayment | Self::CancelledByUser => true,
            Self::New
            | Self::AwaitingDisclaimer
            | Self::WarnedNoResponse
            | Self::TrialActive
            | Self::PendingPaymentAfterTrial
            | Self::PaidSubscriber => false,
        }
    }

    /// Stages in which the user is a member of the channel.
    pub const fn has_channel_access(self) -> bool {
        match self {
            Self::TrialActive | Self::PendingPaymentAfterTrial | Self::PaidSubscriber => true,
            Self::New
            | Self::AwaitingDisclaimer
            | Self::WarnedNoResponse
            | Self::CancelledNoResponse
            | Self::ExpiredNoPayment
            | Self::CancelledByUser => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::AwaitingDisclaimer => "awaiting_disclaimer",
            Self::WarnedNoResponse => "warned_no_response",
            Self::CancelledNoResponse => "cancelled_no_response",
            Self::TrialActive => "trial_active",
            Self::PendingPaymentAfterTrial => "pending_payment_after_trial",
            Self::PaidSubscriber => "paid_subscriber",
            Self::ExpiredNoPayment => "expired_no_payment",
            Self::CancelledByUser => "cancelled_by_user",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw field set used by storage adapters to rebuild a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecordParts {
    pub user_id: UserId,
    pub username: String,
    pub email: Option<EmailAddress>,
    pub disclaimer_status: DisclaimerStatus,
    pub payment_status: Option<PaymentStatus>,
    pub disclaimer_sent_at: DateTime<Utc>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub warned_at: Option<DateTime<Utc>>,
    pub external_sale_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub last_update: DateTime<Utc>,
}

/// One user's subscription state.
///
/// ## Invariants
/// - `trial_start` and `trial_end` are set together and never recomputed
///   once set, except by a fresh onboarding restart which clears them.
/// - `warned_at` is set only while the disclaimer warning stands and is
///   cleared by an onboarding restart.
/// - `last_update` moves forward on every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    user_id: UserId,
    username: String,
    email: Option<EmailAddress>,
    disclaimer_status: DisclaimerStatus,
    payment_status: Option<PaymentStatus>,
    disclaimer_sent_at: DateTime<Utc>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    warned_at: Option<DateTime<Utc>>,
    external_sale_id: Option<String>,
    external_subscription_id: Option<String>,
    last_update: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// Fresh record for a user who has just been sent the disclaimer.
    pub fn new_pending(user_id: UserId, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: username.into(),
            email: None,
            disclaimer_status: DisclaimerStatus::PendingDisclaimer,
            payment_status: None,
            disclaimer_sent_at: now,
            trial_start: None,
            trial_end: None,
            warned_at: None,
            external_sale_id: None,
            external_subscription_id: None,
            last_update: now,
        }
    }

    /// Rebuild a record from stored fields.
    pub fn restore(parts: SubscriptionRecordParts) -> Self {
        let SubscriptionRecordParts {
            user_id,
            username,
            email,
            disclaimer_status,
            payment_status,
            disclaimer_sent_at,
            trial_start,
            trial_end,
            warned_at,
            external_sale_id,
            external_subscription_id,
            last_update,
        } = parts;
        Self {
            user_id,
            username,
            email,
            disclaimer_status,
            payment_status,
            disclaimer_sent_at,
            trial_start,
            trial_end,
            warned_at,
            external_sale_id,
            external_subscription_id,
            last_update,
        }
    }

    /// Decompose into stored fields.
    pub fn into_parts(self) -> SubscriptionRecordParts {
        SubscriptionRecordParts {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            disclaimer_status: self.disclaimer_status,
            payment_status: self.payment_status,
            disclaimer_sent_at: self.disclaimer_sent_at,
            trial_start: self.trial_start,
            trial_end: self.trial_end,
            warned_at: self.warned_at,
            external_sale_id: self.external_sale_id,
            external_subscription_id: self.external_subscription_id,
            last_update: self.last_update,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&EmailAddress> {
        self.email.as_ref()
    }

    pub fn disclaimer_status(&self) -> DisclaimerStatus {
        self.disclaimer_status
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_status
    }

    pub fn disclaimer_sent_at(&self) -> DateTime<Utc> {
        self.disclaimer_sent_at
    }

    pub fn trial_start(&self) -> Option<DateTime<Utc>> {
        self.trial_start
    }

    pub fn trial_end(&self) -> Option<DateTime<Utc>> {
        self.trial_end
    }

    /// When the final disclaimer warning went out.
    pub fn warned_at(&self) -> Option<DateTime<Utc>> {
        self.warned_at
    }

    pub fn external_sale_id(&self) -> Option<&str> {
        self.external_sale_id.as_deref()
    }

    pub fn external_subscription_id(&self) -> Option<&str> {
        self.external_subscription_id.as_deref()
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Derived lifecycle stage. The payment axis dominates once set.
    pub fn stage(&self) -> LifecycleStage {
        match self.payment_status {
            Some(payment) => match payment {
                PaymentStatus::Trial => LifecycleStage::TrialActive,
                PaymentStatus::PendingPaymentAfterTrial => LifecycleStage::PendingPaymentAfterTrial,
                PaymentStatus::PaidSubscriber => LifecycleStage::PaidSubscriber,
                PaymentStatus::ExpiredNoPayment => LifecycleStage::ExpiredNoPayment,
                PaymentStatus::CancelledByUser => LifecycleStage::CancelledByUser,
            },
            None => match self.disclaimer_status {
                DisclaimerStatus::PendingDisclaimer => LifecycleStage::AwaitingDisclaimer,
                DisclaimerStatus::WarnedNoResponse => LifecycleStage::WarnedNoResponse,
                DisclaimerStatus::CancelledNoResponse => LifecycleStage::CancelledNoResponse,
                // Confirmation always starts the trial; a bare confirmation
                // without a payment axis is treated as trialling.
                DisclaimerStatus::Confirmed => LifecycleStage::TrialActive,
            },
        }
    }

    /// Restart onboarding on an existing row.
    ///
    /// Clears everything a previous run produced except the external
    /// provider identifiers, which stay for reconciliation.
    pub fn restart_onboarding(&mut self, username: impl Into<String>, now: DateTime<Utc>) {
        self.username = username.into();
        self.email = None;
        self.disclaimer_status = DisclaimerStatus::PendingDisclaimer;
        self.payment_status = None;
        self.disclaimer_sent_at = now;
        self.trial_start = None;
        self.trial_end = None;
        self.warned_at = None;
        self.touch(now);
    }

    /// Record the disclaimer confirmation and start the trial.
    ///
    /// Existing trial bounds are kept as they are.
    pub fn confirm_disclaimer(
        &mut self,
        email: EmailAddress,
        now: DateTime<Utc>,
        trial_length: TimeDelta,
    ) {
        self.email = Some(email);
        self.disclaimer_status = DisclaimerStatus::Confirmed;
        self.payment_status = Some(PaymentStatus::Trial);
        if self.trial_start.is_none() || self.trial_end.is_none() {
            self.trial_start = Some(now);
            self.trial_end = Some(
                now.checked_add_signed(trial_length)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            );
        }
        self.touch(now);
    }

    pub fn mark_disclaimer_warned(&mut self, now: DateTime<Utc>) {
        self.disclaimer_status = DisclaimerStatus::WarnedNoResponse;
        self.warned_at = Some(now);
        self.touch(now);
    }

    pub fn mark_disclaimer_cancelled(&mut self, now: DateTime<Utc>) {
        self.disclaimer_status = DisclaimerStatus::CancelledNoResponse;
        self.touch(now);
    }

    pub fn mark_pending_payment(&mut self, now: DateTime<Utc>) {
        self.payment_status = Some(PaymentStatus::PendingPaymentAfterTrial);
        self.touch(now);
    }

    pub fn mark_expired(&mut self, now: DateTime<Utc>) {
        self.payment_status = Some(PaymentStatus::ExpiredNoPayment);
        self.touch(now);
    }

    pub fn mark_cancelled_by_user(&mut self, now: DateTime<Utc>) {
        self.payment_status = Some(PaymentStatus::CancelledByUser);
        self.touch(now);
    }

    /// Record a successful payment. Also marks the disclaimer confirmed,
    /// since paying implies acceptance.
    pub fn mark_paid(
        &mut self,
        sale_id: impl Into<String>,
        subscription_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.payment_status = Some(PaymentStatus::PaidSubscriber);
        self.disclaimer_status = DisclaimerStatus::Confirmed;
        self.external_sale_id = Some(sale_id.into());
        if subscription_id.is_some() {
            self.external_subscription_id = subscription_id;
        }
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_update {
            self.last_update = now;
        }
    }
}
