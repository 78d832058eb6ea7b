//! Subscription lifecycle backend for a paid chat channel.
//!
//! Users onboard through a chat bot, get a time-limited trial, are reminded to
//! pay, and are removed from the channel when they neither pay nor cancel.
//! Payment notifications from the provider's webhook reconcile records.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use inbound::http::ApiDoc;
