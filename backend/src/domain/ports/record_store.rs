//! Persistence port for subscription records.
//!
//! The store is keyed by user id. Implementations must make `upsert` atomic
//! per record; the engine serialises writers per user on top of that.
use async_trait::async_trait;

use super::define_port_error;
use crate::domain::subscription::{EmailAddress, SubscriptionRecord, UserId};

define_port_error! {
    /// Errors raised by record store adapters.
    pub enum RecordStoreError {
        /// The backing store could not be reached.
        Connection { message: String } => "record store connection failed: {message}",
        /// A query or write failed during execution.
        Query { message: String } => "record store query failed: {message}",
        /// A stored row could not be mapped back into a record.
        Corrupt { message: String } => "stored subscription record is corrupt: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record for a user, if any.
    async fn get(&self, user_id: UserId) -> Result<Option<SubscriptionRecord>, RecordStoreError>;

    /// Find the record holding an email address.
    ///
    /// When several rows share the address the lowest user id wins.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, RecordStoreError>;

    /// Insert or replace a record.
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), RecordStoreError>;

    /// All records whose stage is not terminal, ordered by user id.
    async fn list_open(&self) -> Result<Vec<SubscriptionRecord>, RecordStoreError>;
}
