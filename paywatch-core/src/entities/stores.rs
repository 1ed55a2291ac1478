use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// Columns of a store needed to open its wallet and notify its webhook.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoreWalletRow {
    pub id: i32,
    pub wallet_view_key: String,
    pub webhook: String,
    pub webhook_secret_key: String,
}

#[derive(Debug, Clone, Copy)]
/// Get the wallet credentials and webhook target of a store.
pub struct GetStoreWalletRow {
    pub store_id: i32,
}

impl Processor<GetStoreWalletRow> for DatabaseProcessor {
    type Output = Option<StoreWalletRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetStoreWalletRow")]
    async fn process(&self, query: GetStoreWalletRow) -> Result<Option<StoreWalletRow>, sqlx::Error> {
        sqlx::query_as::<_, StoreWalletRow>(
            r#"
            SELECT id, wallet_view_key, webhook, webhook_secret_key
            FROM stores
            WHERE id = $1
            "#,
        )
        .bind(query.store_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Get the hex-encoded API secret a store signs payment requests with.
pub struct GetStoreSecretKey {
    pub store_id: i32,
}

impl Processor<GetStoreSecretKey> for DatabaseProcessor {
    type Output = Option<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetStoreSecretKey")]
    async fn process(&self, query: GetStoreSecretKey) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT secret_key FROM stores WHERE id = $1")
            .bind(query.store_id)
            .fetch_optional(&self.pool)
            .await
    }
}
