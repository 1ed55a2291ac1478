use crate::entities::PaymentStatus;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub atomic_amount: i64,
    pub integrated_address: String,
    pub store_id: i32,
    pub creation_time: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// Get a payment by its identifier.
pub struct GetPaymentById {
    pub payment_id: String,
}

impl Processor<GetPaymentById> for DatabaseProcessor {
    type Output = Option<PaymentRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentById")]
    async fn process(&self, query: GetPaymentById) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_id, status, atomic_amount, integrated_address, store_id, creation_time
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(query.payment_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Insert a new `pending` payment. The database assigns `creation_time`.
pub struct InsertPayment {
    pub payment_id: String,
    pub atomic_amount: i64,
    pub integrated_address: String,
    pub store_id: i32,
}

impl Processor<InsertPayment> for DatabaseProcessor {
    type Output = PaymentRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPayment")]
    async fn process(&self, insert: InsertPayment) -> Result<PaymentRecord, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payments (payment_id, status, atomic_amount, integrated_address, store_id)
            VALUES ($1, 'pending', $2, $3, $4)
            RETURNING payment_id, status, atomic_amount, integrated_address, store_id, creation_time
            "#,
        )
        .bind(insert.payment_id)
        .bind(insert.atomic_amount)
        .bind(insert.integrated_address)
        .bind(insert.store_id)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Move a payment out of `pending`.
///
/// The update is conditional on the row still being `pending`, so at most one
/// transition per payment is ever committed. Returns the number of rows
/// changed (0 when somebody else resolved it first).
pub struct UpdatePendingPaymentStatus {
    pub payment_id: String,
    pub status: PaymentStatus,
}

impl Processor<UpdatePendingPaymentStatus> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdatePendingPaymentStatus")]
    async fn process(&self, update: UpdatePendingPaymentStatus) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1
            WHERE payment_id = $2 AND status = 'pending'
            "#,
        )
        .bind(update.status)
        .bind(update.payment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy)]
/// Mark every `pending` payment of every store as `error`.
pub struct ErrorAllPendingPayments;

impl Processor<ErrorAllPendingPayments> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ErrorAllPendingPayments")]
    async fn process(&self, _: ErrorAllPendingPayments) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE payments SET status = 'error' WHERE status = 'pending'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Check that neither the payment identifier nor the integrated address is
/// already taken by a persisted payment.
pub struct IsUniqueIntegratedAddress {
    pub payment_id: String,
    pub integrated_address: String,
}

impl Processor<IsUniqueIntegratedAddress> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:IsUniqueIntegratedAddress")]
    async fn process(&self, query: IsUniqueIntegratedAddress) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE payment_id = $1 OR integrated_address = $2
            )
            "#,
        )
        .bind(query.payment_id)
        .bind(query.integrated_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(!taken)
    }
}

#[derive(Debug, Clone)]
/// Get the payments of one store whose ids are in `payment_ids`, newest first.
pub struct GetStorePaymentsByIds {
    pub store_id: i32,
    pub payment_ids: Vec<String>,
}

impl Processor<GetStorePaymentsByIds> for DatabaseProcessor {
    type Output = Vec<PaymentRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetStorePaymentsByIds")]
    async fn process(&self, query: GetStorePaymentsByIds) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_id, status, atomic_amount, integrated_address, store_id, creation_time
            FROM payments
            WHERE store_id = $1 AND payment_id = ANY($2)
            ORDER BY creation_time DESC, payment_id
            "#,
        )
        .bind(query.store_id)
        .bind(query.payment_ids)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentSortKey {
    #[default]
    CreationTime,
    AtomicAmount,
}

impl PaymentSortKey {
    fn column(self) -> &'static str {
        match self {
            PaymentSortKey::CreationTime => "creation_time",
            PaymentSortKey::AtomicAmount => "atomic_amount",
        }
    }
}

/// Which payments of a store a listing returns, and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub sort_by: PaymentSortKey,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy)]
/// Count the payments of one store, optionally only those in one status.
pub struct CountStorePayments {
    pub store_id: i32,
    pub status: Option<PaymentStatus>,
}

impl Processor<CountStorePayments> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountStorePayments")]
    async fn process(&self, query: CountStorePayments) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payments
            WHERE store_id = $1 AND ($2::payment_status IS NULL OR status = $2)
            "#,
        )
        .bind(query.store_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// One page of a store's payments.
pub struct ListStorePayments {
    pub store_id: i32,
    pub filter: PaymentFilter,
}

impl Processor<ListStorePayments> for DatabaseProcessor {
    type Output = Vec<PaymentRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListStorePayments")]
    async fn process(&self, query: ListStorePayments) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        let filter = query.filter;
        // Column and direction come from closed enums, never from input text.
        let sql = format!(
            r#"
            SELECT payment_id, status, atomic_amount, integrated_address, store_id, creation_time
            FROM payments
            WHERE store_id = $1 AND ($2::payment_status IS NULL OR status = $2)
            ORDER BY {} {}, payment_id
            LIMIT $3 OFFSET $4
            "#,
            filter.sort_by.column(),
            if filter.descending { "DESC" } else { "ASC" },
        );
        sqlx::query_as::<_, PaymentRecord>(&sql)
            .bind(query.store_id)
            .bind(filter.status)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
    }
}
