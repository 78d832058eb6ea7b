//! HTTP server configuration object.

use std::net::SocketAddr;

use crate::inbound::http::state::WebhookSecret;

/// JSON bodies larger than this are rejected before reaching a handler.
pub const DEFAULT_JSON_LIMIT: usize = 64 * 1024;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) payment_secret: Option<WebhookSecret>,
    pub(crate) telegram_secret: Option<WebhookSecret>,
    pub(crate) json_limit: usize,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            payment_secret: None,
            telegram_secret: None,
            json_limit: DEFAULT_JSON_LIMIT,
        }
    }

    /// Require `?secret=` on the payment webhook.
    #[must_use]
    pub fn with_payment_secret(mut self, secret: Option<&str>) -> Self {
        self.payment_secret = secret.map(WebhookSecret::new);
        self
    }

    /// Require the Bot API secret token header on chat updates.
    #[must_use]
    pub fn with_telegram_secret(mut self, secret: Option<&str>) -> Self {
        self.telegram_secret = secret.map(WebhookSecret::new);
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
