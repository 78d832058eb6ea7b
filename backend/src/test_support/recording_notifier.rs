//! Chat platform double that records every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{InviteLink, InviteLinkRequest, NotificationError, NotificationPort};
use crate::domain::subscription::UserId;

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Message { user_id: UserId, text: String },
    Invite(InviteLinkRequest),
    Ban(UserId),
    Unban(UserId),
}

/// Records calls and answers them, or fails them all when told to.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Make every subsequent call fail. Calls are still recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Texts sent to one user, oldest first.
    pub fn messages_to(&self, user_id: UserId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Notification::Message { user_id: to, text } if to == user_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn invites(&self) -> Vec<InviteLinkRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Notification::Invite(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, call: Notification) -> Result<(), NotificationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::transport("recording notifier offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn send_message(&self, user_id: UserId, text: &str) -> Result<(), NotificationError> {
        self.record(Notification::Message {
            user_id,
            text: text.to_owned(),
        })
    }

    async fn create_invite_link(
        &self,
        request: &InviteLinkRequest,
    ) -> Result<InviteLink, NotificationError> {
        self.record(Notification::Invite(request.clone()))?;
        Ok(InviteLink {
            url: format!("https://t.me/+{}", request.name),
        })
    }

    async fn ban_member(&self, user_id: UserId) -> Result<(), NotificationError> {
        self.record(Notification::Ban(user_id))
    }

    async fn unban_member(&self, user_id: UserId) -> Result<(), NotificationError> {
        self.record(Notification::Unban(user_id))
    }
}
