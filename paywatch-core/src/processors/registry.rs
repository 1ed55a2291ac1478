//! Process-wide map from store id to its [`StoreWalletContext`].

use super::pending_set::PendingPayment;
use super::store_wallet::{StoreWalletContext, WatcherDeps};
use crate::entities::PaymentStatus;
use crate::entities::payments::PaymentRecord;
use crate::store::{NewPayment, StoreError};
use crate::wallet::{WalletError, WalletFactory};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store {0} does not exist")]
    UnknownStore(i32),
    #[error("cannot open wallet of store {store_id}: {source}")]
    WalletCreation {
        store_id: i32,
        #[source]
        source: WalletError,
    },
    #[error("wallet of store {0} is offline")]
    WalletOffline(i32),
    #[error("wallet of store {0} still has pending payments")]
    WalletBusy(i32),
    #[error("wallet of store {0} has been closed")]
    WalletClosed(i32),
    #[error("payment {0} is already being watched")]
    DuplicatePayment(String),
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Owns one [`StoreWalletContext`] per store that has needed its wallet.
///
/// Contexts are created on first use and kept; an idle context just has no
/// running poll loop.
pub struct StoreWalletRegistry {
    contexts: RwLock<HashMap<i32, Arc<StoreWalletContext>>>,
    wallets: Arc<dyn WalletFactory>,
    pub(super) deps: WatcherDeps,
}

impl StoreWalletRegistry {
    pub fn new(wallets: Arc<dyn WalletFactory>, deps: WatcherDeps) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            wallets,
            deps,
        }
    }

    pub fn deps(&self) -> &WatcherDeps {
        &self.deps
    }

    /// The context of `store_id`, opening its wallet on first use.
    ///
    /// Concurrent callers for the same store all get the same context; the
    /// wallet is opened once.
    pub async fn get_or_create(
        &self,
        store_id: i32,
    ) -> Result<Arc<StoreWalletContext>, RegistryError> {
        if let Some(ctx) = self.contexts.read().await.get(&store_id) {
            return Ok(Arc::clone(ctx));
        }

        let mut contexts = self.contexts.write().await;
        if let Some(ctx) = contexts.get(&store_id) {
            return Ok(Arc::clone(ctx));
        }
        let credentials = self
            .deps
            .store
            .wallet_credentials(store_id)
            .await?
            .ok_or(RegistryError::UnknownStore(store_id))?;
        let wallet = self
            .wallets
            .open(store_id, &credentials.view_key)
            .await
            .map_err(|source| RegistryError::WalletCreation { store_id, source })?;
        let ctx = StoreWalletContext::new(store_id, wallet, credentials.webhook, self.deps.clone());
        contexts.insert(store_id, Arc::clone(&ctx));
        info!(store_id, "Opened store wallet");
        Ok(ctx)
    }

    pub async fn has(&self, store_id: i32) -> bool {
        self.contexts.read().await.contains_key(&store_id)
    }

    pub async fn get(&self, store_id: i32) -> Option<Arc<StoreWalletContext>> {
        self.contexts.read().await.get(&store_id).cloned()
    }

    pub async fn contexts(&self) -> Vec<Arc<StoreWalletContext>> {
        self.contexts.read().await.values().cloned().collect()
    }

    /// Start watching a payment that is already persisted as `pending`.
    pub async fn register_pending_payment(
        &self,
        store_id: i32,
        payment_id: String,
        expected_atomic_amount: u64,
    ) -> Result<(), RegistryError> {
        let ctx = self.get_or_create(store_id).await?;
        let payment = PendingPayment::new(
            payment_id,
            expected_atomic_amount,
            time::OffsetDateTime::now_utc(),
        );
        ctx.add_pending_payment(payment).await
    }

    /// Create a payment for `store_id`: draw a unique integrated address,
    /// persist the payment as `pending` and start watching it.
    ///
    /// A payment committed concurrently with the same address sends the draw
    /// around again.
    pub async fn open_payment(
        &self,
        store_id: i32,
        atomic_amount: u64,
    ) -> Result<PaymentRecord, RegistryError> {
        let ctx = self.get_or_create(store_id).await?;
        if !ctx.wallet().is_online().await {
            return Err(RegistryError::WalletOffline(store_id));
        }
        let record = loop {
            let address = ctx.generate_unique_address().await?;
            let payment_id = address.payment_id.clone();
            match self
                .deps
                .store
                .insert_payment(NewPayment {
                    store_id,
                    atomic_amount,
                    address,
                })
                .await
            {
                Ok(record) => break record,
                Err(StoreError::AddressTaken) => {
                    debug!(
                        store_id,
                        %payment_id,
                        "Integrated address taken concurrently, drawing another"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        let pending = PendingPayment::new(
            record.payment_id.clone(),
            atomic_amount,
            record.creation_time,
        );
        if let Err(e) = ctx.add_pending_payment(pending).await {
            // Nobody would ever resolve this row.
            if let Err(db) = self
                .deps
                .store
                .set_status_if_pending(&record.payment_id, PaymentStatus::Error)
                .await
            {
                error!(
                    store_id,
                    payment_id = %record.payment_id,
                    error = %db,
                    "Failed to mark unwatched payment as error"
                );
            }
            return Err(e);
        }
        info!(store_id, payment_id = %record.payment_id, atomic_amount, "Payment opened");
        Ok(record)
    }

    /// Reload the webhook target of an active wallet from the store record.
    ///
    /// Returns `false` when the store has no active wallet; its next context
    /// will read the new target anyway.
    pub async fn refresh_webhook(&self, store_id: i32) -> Result<bool, RegistryError> {
        let Some(ctx) = self.get(store_id).await else {
            return Ok(false);
        };
        let credentials = self
            .deps
            .store
            .wallet_credentials(store_id)
            .await?
            .ok_or(RegistryError::UnknownStore(store_id))?;
        ctx.set_webhook(credentials.webhook).await;
        info!(store_id, "Webhook target refreshed");
        Ok(true)
    }

    /// Close and forget the wallet of `store_id`, e.g. before its view key
    /// changes. Refused while it has pending payments.
    ///
    /// Returns `false` when the store had no active wallet.
    pub async fn teardown(&self, store_id: i32) -> Result<bool, RegistryError> {
        let mut contexts = self.contexts.write().await;
        let Some(ctx) = contexts.get(&store_id).cloned() else {
            return Ok(false);
        };
        ctx.close().await?;
        contexts.remove(&store_id);
        info!(store_id, "Store wallet closed");
        Ok(true)
    }
}
