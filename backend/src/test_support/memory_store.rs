//! In-memory [`RecordStore`] with switchable outages.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{RecordStore, RecordStoreError};
use crate::domain::subscription::{EmailAddress, SubscriptionRecord, UserId};

/// Record store backed by a `BTreeMap`, so iteration follows user id order.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<UserId, SubscriptionRecord>>,
    unavailable: AtomicBool,
    failing_writes_for: Mutex<Option<UserId>>,
    writes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn with_records(records: impl IntoIterator<Item = SubscriptionRecord>) -> Self {
        let store = Self::default();
        {
            let mut map = store.lock();
            for record in records {
                map.insert(record.user_id(), record);
            }
        }
        store
    }

    /// Make every call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make writes for one user fail with a query error.
    pub fn fail_writes_for(&self, user_id: Option<UserId>) {
        *self
            .failing_writes_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = user_id;
    }

    /// Seed or overwrite a record without going through the port.
    pub fn insert(&self, record: SubscriptionRecord) {
        self.lock().insert(record.user_id(), record);
    }

    pub fn record(&self, user_id: UserId) -> Option<SubscriptionRecord> {
        self.lock().get(&user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of successful upserts.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<UserId, SubscriptionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), RecordStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecordStoreError::connection("in-memory store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, user_id: UserId) -> Result<Option<SubscriptionRecord>, RecordStoreError> {
        self.check_available()?;
        Ok(self.record(user_id))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, RecordStoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .values()
            .find(|record| record.email() == Some(email))
            .cloned())
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), RecordStoreError> {
        self.check_available()?;
        let failing = *self
            .failing_writes_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if failing == Some(record.user_id()) {
            return Err(RecordStoreError::query("write rejected"));
        }
        self.insert(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<SubscriptionRecord>, RecordStoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .values()
            .filter(|record| !record.stage().is_terminal())
            .cloned()
            .collect())
    }
}
