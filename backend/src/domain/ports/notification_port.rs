//! Outbound chat platform port: direct messages, invite links, and
//! channel membership.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::subscription::UserId;

define_port_error! {
    /// Errors raised by the chat platform adapter.
    pub enum NotificationError {
        /// The platform could not be reached or timed out.
        Transport { message: String } => "chat platform transport failed: {message}",
        /// The platform answered but refused the call.
        Rejected { message: String } => "chat platform rejected the call: {message}",
    }
}

/// Parameters for a single-use channel invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLinkRequest {
    /// Label shown to channel admins.
    pub name: String,
    pub member_limit: u32,
    pub expires_at: DateTime<Utc>,
}

/// Invite link returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    pub url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Send a direct text message to a user.
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), NotificationError>;

    /// Create an invite link for the managed channel.
    async fn create_invite_link(
        &self,
        request: &InviteLinkRequest,
    ) -> Result<InviteLink, NotificationError>;

    /// Remove a user from the managed channel.
    async fn ban_member(&self, user_id: UserId) -> Result<(), NotificationError>;

    /// Lift a ban so the user may rejoin later. No-op when not banned.
    async fn unban_member(&self, user_id: UserId) -> Result<(), NotificationError>;
}
