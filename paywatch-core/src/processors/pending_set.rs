//! In-memory set of the payments one store wallet is watching.

use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// A payment awaiting deposits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    pub payment_id: String,
    pub expected_atomic_amount: u64,
    pub created_at: time::OffsetDateTime,
}

impl PendingPayment {
    pub fn new(
        payment_id: String,
        expected_atomic_amount: u64,
        created_at: time::OffsetDateTime,
    ) -> Self {
        Self {
            payment_id,
            expected_atomic_amount,
            created_at,
        }
    }
}

#[derive(Debug, Error)]
#[error("payment {0} is already being watched")]
pub struct AlreadyWatched(pub String);

/// Payments of one wallet whose persisted status is still `pending`.
///
/// Entries are never overwritten. Starting and stopping the poll loop around
/// membership changes is up to the owning
/// [`StoreWalletContext`](super::store_wallet::StoreWalletContext).
#[derive(Debug, Default)]
pub struct PendingPaymentSet {
    entries: RwLock<HashMap<String, PendingPayment>>,
}

impl PendingPaymentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `payment`, returning the number of entries afterwards.
    pub async fn add(&self, payment: PendingPayment) -> Result<usize, AlreadyWatched> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&payment.payment_id) {
            return Err(AlreadyWatched(payment.payment_id));
        }
        entries.insert(payment.payment_id.clone(), payment);
        Ok(entries.len())
    }

    pub async fn remove(&self, payment_id: &str) -> Option<PendingPayment> {
        self.entries.write().await.remove(payment_id)
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, payment_id: &str) -> bool {
        self.entries.read().await.contains_key(payment_id)
    }

    /// Copy of the current entries, for a sweep that must not hold the lock
    /// across wallet and database calls.
    pub async fn snapshot(&self) -> Vec<PendingPayment> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Remove and return every entry.
    pub async fn drain(&self) -> Vec<PendingPayment> {
        self.entries
            .write()
            .await
            .drain()
            .map(|(_, payment)| payment)
            .collect()
    }
}
