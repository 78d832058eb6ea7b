//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `SUBSCRIPTIONS_*` environment variables, matching CLI
//! flags, or a config file. [`Settings::into_runtime`] validates them once at
//! startup; any failure there is fatal.

use std::ffi::OsString;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::NaiveTime;
use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

use crate::domain::lifecycle::{DEFAULT_CONFIRMATION_KEYWORD, LifecycleConfig};
use crate::outbound::telegram::{DEFAULT_TELEGRAM_API_BASE, TelegramNotifierConfig};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:10000";
const DEFAULT_SWEEP_TIME: &str = "09:00";
const DEFAULT_CHANNEL_NAME: &str = "the VIP channel";
const TELEGRAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SECONDS_PER_HOUR: u64 = 60 * 60;

/// Raw configuration as loaded from the environment and CLI.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SUBSCRIPTIONS")]
pub struct Settings {
    /// Bot API token. Required.
    pub telegram_bot_token: Option<String>,
    /// Managed channel (`@name` or numeric id). Required.
    #[serde(default, deserialize_with = "text_or_number")]
    pub channel_id: Option<String>,
    /// Display name used in user-facing messages.
    #[serde(default, deserialize_with = "text_or_number")]
    pub channel_name: Option<String>,
    /// Product identifier payments must carry. Required.
    #[serde(default, deserialize_with = "text_or_number")]
    pub expected_product_id: Option<String>,
    /// Shared secret the payment webhook URL must carry as `?secret=`.
    #[serde(default, deserialize_with = "text_or_number")]
    pub webhook_secret: Option<String>,
    /// Secret token registered with `setWebhook` for chat updates.
    #[serde(default, deserialize_with = "text_or_number")]
    pub telegram_secret_token: Option<String>,
    /// PostgreSQL connection URL. Required.
    pub database_url: Option<String>,
    /// Checkout page included in trial and reminder messages.
    pub payment_link: Option<String>,
    #[ortho_config(default = 7)]
    pub trial_period_days: u32,
    #[ortho_config(default = 24)]
    pub disclaimer_warning_hours: u32,
    #[ortho_config(default = 4)]
    pub final_cancel_hours: u32,
    #[ortho_config(default = 28)]
    pub payment_grace_hours: u32,
    /// UTC `HH:MM` for the daily sweep.
    pub sweep_time: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub confirmation_keyword: Option<String>,
    pub bind_address: Option<String>,
    #[ortho_config(default = 8)]
    pub invite_link_validity_days: u32,
    /// Bot API base URL override, mainly for local Bot API servers.
    pub telegram_api_base: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("channel_id", &self.channel_id)
            .field("expected_product_id", &self.expected_product_id)
            .field("trial_period_days", &self.trial_period_days)
            .field("sweep_time", &self.sweep_time)
            .field("bind_address", &self.bind_address)
            .finish_non_exhaustive()
    }
}

/// Startup configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to load settings: {0}")]
    Load(String),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Validated, typed configuration consumed by `main`.
pub struct RuntimeSettings {
    pub lifecycle: LifecycleConfig,
    pub telegram: TelegramNotifierConfig,
    pub database_url: Zeroizing<String>,
    pub bind_address: SocketAddr,
    pub webhook_secret: Option<Zeroizing<String>>,
    pub telegram_secret_token: Option<Zeroizing<String>>,
}

/// Accept a free-text setting the environment layer has already read as a
/// number, such as a `-100...` channel id.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Signed(number) => number.to_string(),
        Raw::Unsigned(number) => number.to_string(),
    }))
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    present(value).ok_or(ConfigError::Missing(field))
}

fn hours(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * SECONDS_PER_HOUR)
}

fn parse_sweep_time(value: Option<String>) -> Result<NaiveTime, ConfigError> {
    let raw = present(value).unwrap_or_else(|| DEFAULT_SWEEP_TIME.to_owned());
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .map_err(|error| ConfigError::invalid("sweep_time", format!("`{raw}` is not HH:MM ({error})")))
}

impl Settings {
    /// Load from the process environment and arguments, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading fails or a value is missing or
    /// malformed.
    pub fn load_runtime() -> Result<RuntimeSettings, ConfigError> {
        Self::load_runtime_from(std::env::args_os())
    }

    /// As [`Settings::load_runtime`] with explicit arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading fails or a value is missing or
    /// malformed.
    pub fn load_runtime_from<I>(args: I) -> Result<RuntimeSettings, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<OsString> + Clone,
    {
        Self::load_from_iter(args)
            .map_err(|error| ConfigError::Load(error.to_string()))?
            .into_runtime()
    }

    /// Validate raw settings into their runtime form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing required values or malformed ones.
    pub fn into_runtime(self) -> Result<RuntimeSettings, ConfigError> {
        let token = required(self.telegram_bot_token, "telegram_bot_token")?;
        let channel_id = required(self.channel_id, "channel_id")?;
        let expected_product_id = required(self.expected_product_id, "expected_product_id")?;
        let database_url = required(self.database_url, "database_url")?;

        if self.trial_period_days == 0 {
            return Err(ConfigError::invalid("trial_period_days", "must be at least 1"));
        }
        if self.invite_link_validity_days == 0 {
            return Err(ConfigError::invalid(
                "invite_link_validity_days",
                "must be at least 1",
            ));
        }

        let bind_raw =
            present(self.bind_address).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .map_err(|error| ConfigError::invalid("bind_address", format!("`{bind_raw}`: {error}")))?;

        let api_raw = present(self.telegram_api_base)
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_owned());
        let api_base = Url::parse(&api_raw)
            .map_err(|error| ConfigError::invalid("telegram_api_base", error.to_string()))?;

        let payment_link = present(self.payment_link);
        if let Some(link) = &payment_link {
            Url::parse(link)
                .map_err(|error| ConfigError::invalid("payment_link", error.to_string()))?;
        }

        let mut lifecycle = LifecycleConfig::new(expected_product_id);
        lifecycle.trial_period_days = self.trial_period_days;
        lifecycle.disclaimer_warning_delay = hours(self.disclaimer_warning_hours);
        lifecycle.final_cancel_delay = hours(self.final_cancel_hours);
        lifecycle.payment_grace = hours(self.payment_grace_hours);
        lifecycle.invite_link_validity = hours(self.invite_link_validity_days.saturating_mul(24));
        lifecycle.confirmation_keyword = present(self.confirmation_keyword)
            .unwrap_or_else(|| DEFAULT_CONFIRMATION_KEYWORD.to_owned());
        lifecycle.channel_name =
            present(self.channel_name).unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_owned());
        lifecycle.payment_link = payment_link;
        lifecycle.sweep_time = parse_sweep_time(self.sweep_time)?;

        Ok(RuntimeSettings {
            lifecycle,
            telegram: TelegramNotifierConfig {
                bot_token: Zeroizing::new(token),
                channel_id,
                api_base,
                request_timeout: TELEGRAM_REQUEST_TIMEOUT,
            },
            database_url: Zeroizing::new(database_url),
            bind_address,
            webhook_secret: present(self.webhook_secret).map(Zeroizing::new),
            telegram_secret_token: present(self.telegram_secret_token).map(Zeroizing::new),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Configuration parsing against a locked environment.

    use super::*;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 18] = [
        "SUBSCRIPTIONS_TELEGRAM_BOT_TOKEN",
        "SUBSCRIPTIONS_CHANNEL_ID",
        "SUBSCRIPTIONS_CHANNEL_NAME",
        "SUBSCRIPTIONS_EXPECTED_PRODUCT_ID",
        "SUBSCRIPTIONS_WEBHOOK_SECRET",
        "SUBSCRIPTIONS_TELEGRAM_SECRET_TOKEN",
        "SUBSCRIPTIONS_DATABASE_URL",
        "SUBSCRIPTIONS_PAYMENT_LINK",
        "SUBSCRIPTIONS_TRIAL_PERIOD_DAYS",
        "SUBSCRIPTIONS_DISCLAIMER_WARNING_HOURS",
        "SUBSCRIPTIONS_FINAL_CANCEL_HOURS",
        "SUBSCRIPTIONS_PAYMENT_GRACE_HOURS",
        "SUBSCRIPTIONS_SWEEP_TIME",
        "SUBSCRIPTIONS_CONFIRMATION_KEYWORD",
        "SUBSCRIPTIONS_BIND_ADDRESS",
        "SUBSCRIPTIONS_INVITE_LINK_VALIDITY_DAYS",
        "SUBSCRIPTIONS_TELEGRAM_API_BASE",
        "SUBSCRIPTIONS_CONFIG_PATH",
    ];

    /// Every known variable cleared, then `overrides` applied.
    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SUBSCRIPTIONS_TELEGRAM_BOT_TOKEN", "123:abc"),
        ("SUBSCRIPTIONS_CHANNEL_ID", "-1001234"),
        ("SUBSCRIPTIONS_EXPECTED_PRODUCT_ID", "peak-vip"),
        ("SUBSCRIPTIONS_DATABASE_URL", "postgres://localhost/subs"),
    ];

    fn load() -> Result<RuntimeSettings, ConfigError> {
        Settings::load_runtime_from([OsString::from("subscription-backend")])
    }

    #[rstest]
    fn defaults_apply_when_only_required_values_are_set() {
        let _guard = lock_env(env_with(&REQUIRED));

        let runtime = load().expect("settings load");
        assert_eq!(runtime.lifecycle.trial_period_days, 7);
        assert_eq!(runtime.lifecycle.disclaimer_warning_delay, hours(24));
        assert_eq!(runtime.lifecycle.final_cancel_delay, hours(4));
        assert_eq!(runtime.lifecycle.payment_grace, hours(28));
        assert_eq!(runtime.lifecycle.invite_link_validity, hours(8 * 24));
        assert_eq!(runtime.lifecycle.confirmation_keyword, "מאשר");
        assert_eq!(runtime.lifecycle.expected_product_id, "peak-vip");
        assert_eq!(
            runtime.lifecycle.sweep_time,
            NaiveTime::from_hms_opt(9, 0, 0).expect("time")
        );
        assert_eq!(runtime.bind_address, "0.0.0.0:10000".parse().expect("addr"));
        assert_eq!(runtime.telegram.channel_id, "-1001234");
        assert_eq!(runtime.telegram.api_base.as_str(), "https://api.telegram.org/");
        assert!(runtime.webhook_secret.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SUBSCRIPTIONS_TRIAL_PERIOD_DAYS", "14"),
            ("SUBSCRIPTIONS_DISCLAIMER_WARNING_HOURS", "12"),
            ("SUBSCRIPTIONS_SWEEP_TIME", "06:30"),
            ("SUBSCRIPTIONS_WEBHOOK_SECRET", "hunter2"),
            ("SUBSCRIPTIONS_PAYMENT_LINK", "https://pay.example.com/vip"),
            ("SUBSCRIPTIONS_BIND_ADDRESS", "127.0.0.1:8081"),
        ]);
        let _guard = lock_env(env_with(&vars));

        let runtime = load().expect("settings load");
        assert_eq!(runtime.lifecycle.trial_period_days, 14);
        assert_eq!(runtime.lifecycle.disclaimer_warning_delay, hours(12));
        assert_eq!(
            runtime.lifecycle.sweep_time,
            NaiveTime::from_hms_opt(6, 30, 0).expect("time")
        );
        assert_eq!(
            runtime.lifecycle.payment_link.as_deref(),
            Some("https://pay.example.com/vip")
        );
        assert_eq!(
            runtime.webhook_secret.as_deref().map(String::as_str),
            Some("hunter2")
        );
        assert_eq!(runtime.bind_address.port(), 8081);
    }

    #[rstest]
    #[case("SUBSCRIPTIONS_TELEGRAM_BOT_TOKEN", "telegram_bot_token")]
    #[case("SUBSCRIPTIONS_CHANNEL_ID", "channel_id")]
    #[case("SUBSCRIPTIONS_EXPECTED_PRODUCT_ID", "expected_product_id")]
    #[case("SUBSCRIPTIONS_DATABASE_URL", "database_url")]
    fn missing_required_value_is_fatal(#[case] dropped: &str, #[case] field: &'static str) {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(name, _)| *name != dropped)
            .collect();
        let _guard = lock_env(env_with(&vars));

        assert_eq!(load().err(), Some(ConfigError::Missing(field)));
    }

    #[rstest]
    #[case("SUBSCRIPTIONS_SWEEP_TIME", "9am", "sweep_time")]
    #[case("SUBSCRIPTIONS_BIND_ADDRESS", "localhost", "bind_address")]
    #[case("SUBSCRIPTIONS_TRIAL_PERIOD_DAYS", "0", "trial_period_days")]
    #[case("SUBSCRIPTIONS_PAYMENT_LINK", "not a url", "payment_link")]
    fn malformed_values_are_fatal(
        #[case] var: &str,
        #[case] value: &str,
        #[case] field: &'static str,
    ) {
        let mut vars = REQUIRED.to_vec();
        vars.push((var, value));
        let _guard = lock_env(env_with(&vars));

        assert!(matches!(
            load(),
            Err(ConfigError::Invalid { field: reported, .. }) if reported == field
        ));
    }

    #[rstest]
    #[case("-100591679360", "12345")]
    #[case("@peakvip", "peak-vip")]
    fn numeric_identifiers_are_kept_as_text(#[case] channel: &str, #[case] product: &str) {
        let _guard = lock_env(env_with(&[
            ("SUBSCRIPTIONS_TELEGRAM_BOT_TOKEN", "123:abc"),
            ("SUBSCRIPTIONS_CHANNEL_ID", channel),
            ("SUBSCRIPTIONS_EXPECTED_PRODUCT_ID", product),
            ("SUBSCRIPTIONS_DATABASE_URL", "postgres://localhost/subs"),
            ("SUBSCRIPTIONS_WEBHOOK_SECRET", "987654"),
        ]));

        let runtime = load().expect("settings load");
        assert_eq!(runtime.telegram.channel_id, channel);
        assert_eq!(runtime.lifecycle.expected_product_id, product);
        assert_eq!(
            runtime.webhook_secret.as_deref().map(String::as_str),
            Some("987654")
        );
    }

    #[rstest]
    fn debug_output_omits_secrets() {
        let _guard = lock_env(env_with(&REQUIRED));
        let settings =
            Settings::load_from_iter([OsString::from("subscription-backend")]).expect("load");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("123:abc"));
        assert!(!rendered.contains("postgres://"));
    }
}
