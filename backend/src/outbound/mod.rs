//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed record store using Diesel ORM
//! - **telegram**: Bot API client for messages, invites, and membership
//! - **timers**: tokio-backed timer registry and its dispatcher
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod persistence;
pub mod telegram;
pub mod timers;
