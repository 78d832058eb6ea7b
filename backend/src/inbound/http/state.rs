//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on the driving port and remain testable without I/O.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::domain::ports::SubscriptionCommands;

/// Shared secret a webhook caller must present.
///
/// Only the SHA-256 digest is kept, and candidates are compared digest to
/// digest so the comparison does not depend on the secret's length.
///
/// # Examples
/// ```
/// use subscription_backend::inbound::http::state::WebhookSecret;
///
/// let secret = WebhookSecret::new("s3cret");
/// assert!(secret.matches("s3cret"));
/// assert!(!secret.matches("S3CRET"));
/// ```
#[derive(Clone)]
pub struct WebhookSecret {
    digest: [u8; 32],
}

impl WebhookSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub commands: Arc<dyn SubscriptionCommands>,
    /// Required as `?secret=` on the payment webhook when set.
    pub payment_secret: Option<WebhookSecret>,
    /// Required in `X-Telegram-Bot-Api-Secret-Token` when set.
    pub telegram_secret: Option<WebhookSecret>,
}

impl HttpState {
    /// State with no webhook secrets configured.
    pub fn new(commands: Arc<dyn SubscriptionCommands>) -> Self {
        Self {
            commands,
            payment_secret: None,
            telegram_secret: None,
        }
    }

    pub fn with_payment_secret(mut self, secret: Option<WebhookSecret>) -> Self {
        self.payment_secret = secret;
        self
    }

    pub fn with_telegram_secret(mut self, secret: Option<WebhookSecret>) -> Self {
        self.telegram_secret = secret;
        self
    }
}
