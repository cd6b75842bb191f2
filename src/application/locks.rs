//! Per-key async locks.
//!
//! Serializes mutations on one appointment, payment subject, token, or
//! queue counter inside this process. The durable store still guards the
//! same writes with status compare-and-swap, so a second process can only
//! lose a race, never corrupt state.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::{AppointmentId, DepartmentId, InvoiceId, TokenId};
use crate::domain::payment::PaymentSubject;

/// Idle entries are pruned once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// What a lock protects.
///
/// An appointment and its payments share one key, so booking state and
/// payment state for the same visit never interleave.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Appointment(AppointmentId),
    Invoice(InvoiceId),
    Token(TokenId),
    QueueCounter(DepartmentId, NaiveDate),
}

impl LockKey {
    /// Lock guarding a payment subject.
    pub fn for_subject(subject: &PaymentSubject) -> Self {
        match subject {
            PaymentSubject::Appointment(id) => LockKey::Appointment(*id),
            PaymentSubject::Invoice(id) => LockKey::Invoice(id.clone()),
        }
    }
}

/// Lazily created async mutex per key.
pub struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for exclusive access to `key`.
    ///
    /// The guard releases the lock when dropped. Never hold it across a
    /// payment gateway call.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.len() > PRUNE_THRESHOLD {
                entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
