//! HTTP inbound adapter: webhooks and health checks.

pub mod doc;
pub mod error;
pub mod health;
pub mod payment_webhook;
pub mod state;
pub mod telegram_webhook;

pub use doc::ApiDoc;
pub use error::ApiResult;
