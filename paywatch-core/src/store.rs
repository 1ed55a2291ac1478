//! The persisted side of payment tracking.
//!
//! The watcher only needs a handful of statements from the database. They are
//! collected behind [`PaymentStore`] so the poll loop and crash recovery can
//! run against Postgres in production and an in-memory store in tests.

use crate::entities::PaymentStatus;
use crate::entities::payments::{
    CountStorePayments, ErrorAllPendingPayments, GetPaymentById, GetStorePaymentsByIds,
    InsertPayment, IsUniqueIntegratedAddress, ListStorePayments, PaymentFilter, PaymentRecord,
    UpdatePendingPaymentStatus,
};
use crate::entities::stores::{GetStoreSecretKey, GetStoreWalletRow};
use crate::framework::DatabaseProcessor;
use crate::processors::notifier::WebhookTarget;
use crate::wallet::IntegratedAddress;
use async_trait::async_trait;
use kanau::processor::Processor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("atomic amount {0} does not fit the payments table")]
    AmountOutOfRange(u64),
    /// Another payment committed the same id or integrated address first.
    #[error("payment id or integrated address is already taken")]
    AddressTaken,
}

/// What a store needs to open its wallet and reach its webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletCredentials {
    pub view_key: String,
    pub webhook: WebhookTarget,
}

/// A payment about to be persisted as `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub store_id: i32,
    pub atomic_amount: u64,
    pub address: IntegratedAddress,
}

/// A page of a store's payments together with the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentListing {
    pub total: i64,
    pub payments: Vec<PaymentRecord>,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Credentials of `store_id`, or `None` when the store does not exist.
    async fn wallet_credentials(&self, store_id: i32)
    -> Result<Option<WalletCredentials>, StoreError>;

    /// Compare-and-set from `pending` to `status`. Returns rows affected.
    async fn set_status_if_pending(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError>;

    /// Mark every pending payment of every store as `error`.
    async fn error_all_pending(&self) -> Result<u64, StoreError>;

    /// Whether neither half of `address` is used by a persisted payment.
    async fn is_unique_address(&self, address: &IntegratedAddress) -> Result<bool, StoreError>;

    /// Persist `payment` as `pending`. Fails with [`StoreError::AddressTaken`]
    /// when either half of its address is already stored.
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError>;

    async fn payment_by_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, StoreError>;

    /// Hex secret the store signs its API requests with.
    async fn secret_key(&self, store_id: i32) -> Result<Option<String>, StoreError>;

    /// Payments of `store_id` among `payment_ids`. Unknown ids are skipped.
    async fn payments_by_ids(
        &self,
        store_id: i32,
        payment_ids: &[String],
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    async fn list_payments(
        &self,
        store_id: i32,
        filter: PaymentFilter,
    ) -> Result<PaymentListing, StoreError>;
}

#[async_trait]
impl PaymentStore for DatabaseProcessor {
    async fn wallet_credentials(
        &self,
        store_id: i32,
    ) -> Result<Option<WalletCredentials>, StoreError> {
        let row = self.process(GetStoreWalletRow { store_id }).await?;
        Ok(row.map(|row| WalletCredentials {
            view_key: row.wallet_view_key,
            webhook: WebhookTarget::new(row.webhook, row.webhook_secret_key),
        }))
    }

    async fn set_status_if_pending(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        let rows = self
            .process(UpdatePendingPaymentStatus {
                payment_id: payment_id.to_owned(),
                status,
            })
            .await?;
        Ok(rows)
    }

    async fn error_all_pending(&self) -> Result<u64, StoreError> {
        Ok(self.process(ErrorAllPendingPayments).await?)
    }

    async fn is_unique_address(&self, address: &IntegratedAddress) -> Result<bool, StoreError> {
        let unique = self
            .process(IsUniqueIntegratedAddress {
                payment_id: address.payment_id.clone(),
                integrated_address: address.address.clone(),
            })
            .await?;
        Ok(unique)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError> {
        let atomic_amount = i64::try_from(payment.atomic_amount)
            .map_err(|_| StoreError::AmountOutOfRange(payment.atomic_amount))?;
        let record = self
            .process(InsertPayment {
                payment_id: payment.address.payment_id,
                atomic_amount,
                integrated_address: payment.address.address,
                store_id: payment.store_id,
            })
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AddressTaken,
                other => StoreError::Database(other),
            })?;
        Ok(record)
    }

    async fn payment_by_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, StoreError> {
        let record = self
            .process(GetPaymentById {
                payment_id: payment_id.to_owned(),
            })
            .await?;
        Ok(record)
    }

    async fn secret_key(&self, store_id: i32) -> Result<Option<String>, StoreError> {
        Ok(self.process(GetStoreSecretKey { store_id }).await?)
    }

    async fn payments_by_ids(
        &self,
        store_id: i32,
        payment_ids: &[String],
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let records = self
            .process(GetStorePaymentsByIds {
                store_id,
                payment_ids: payment_ids.to_vec(),
            })
            .await?;
        Ok(records)
    }

    async fn list_payments(
        &self,
        store_id: i32,
        filter: PaymentFilter,
    ) -> Result<PaymentListing, StoreError> {
        let total = self
            .process(CountStorePayments {
                store_id,
                status: filter.status,
            })
            .await?;
        if total <= filter.offset {
            return Ok(PaymentListing {
                total,
                payments: Vec::new(),
            });
        }
        let payments = self.process(ListStorePayments { store_id, filter }).await?;
        Ok(PaymentListing { total, payments })
    }
}
