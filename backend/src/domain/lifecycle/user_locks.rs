//! Per-user mutual exclusion.
//!
//! Every lifecycle handler holds the user's lock for the whole
//! read-modify-write, so two handlers never interleave on one record.
//! Handlers for different users run concurrently. Confirmation also holds a
//! lock on the claimed email address, taken after the user's lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::subscription::{EmailAddress, UserId};

pub(crate) type UserLocks = KeyedLocks<UserId>;
pub(crate) type EmailLocks = KeyedLocks<EmailAddress>;

#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Clone + Eq + Hash> KeyedLocks<K> {
    /// Wait for exclusive access to `key`.
    pub(crate) async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop idle slots so the map tracks only keys with live holders.
            slots.retain(|held, slot| *held == key || Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key).or_default())
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_waits_for_release() {
        let locks = Arc::new(UserLocks::default());
        let guard = locks.acquire(UserId::new(1)).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(UserId::new(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes");
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::default();
        let _first = locks.acquire(UserId::new(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(UserId::new(2)));
        assert!(second.await.is_ok());
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = UserLocks::default();
        drop(locks.acquire(UserId::new(1)).await);
        drop(locks.acquire(UserId::new(2)).await);
        drop(locks.acquire(UserId::new(3)).await);
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn same_email_waits_for_release() {
        let locks = Arc::new(EmailLocks::default());
        let email = EmailAddress::parse("dana@example.com").expect("email");
        let guard = locks.acquire(email.clone()).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(email).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes");
    }
}
