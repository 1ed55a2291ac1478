//! Store API client (merchant backend → paywatch server).

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::{
    CreatePaymentRequest, ListPaymentsQuery, PaymentLookupRequest, PaymentPage, PaymentView,
};
use crate::signature::{SIGNATURE_HEADER, SignedBody, SigningKey};

/// Typed HTTP client for one store's payment endpoints.
///
/// Every store-scoped request body is signed with the store's secret key.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: Client,
    base_url: Url,
    store_id: i32,
    key: SigningKey,
}

impl StoreClient {
    /// Create a new `StoreClient`.
    ///
    /// * `base_url` – root URL of the paywatch server.
    /// * `store_id` – the store the payments are opened for.
    /// * `secret_key_hex` – the store's hex-encoded secret key.
    pub fn new(base_url: Url, store_id: i32, secret_key_hex: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::new(),
            base_url,
            store_id,
            key: SigningKey::from_hex(secret_key_hex)?,
        })
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/stores/{store_id}/payments` – open a new pending payment.
    pub async fn create_payment(&self, atomic_amount: u64) -> Result<PaymentView, ClientError> {
        self.post_signed("payments", CreatePaymentRequest { atomic_amount }).await
    }

    /// `POST /api/v1/stores/{store_id}/payments/lookup` – fetch several
    /// payments of this store at once. Unknown ids are left out.
    pub async fn lookup_payments(
        &self,
        payment_ids: Vec<String>,
    ) -> Result<Vec<PaymentView>, ClientError> {
        self.post_signed("payments/lookup", PaymentLookupRequest { payment_ids }).await
    }

    /// `POST /api/v1/stores/{store_id}/payments/search` – one page of this
    /// store's payments.
    pub async fn list_payments(
        &self,
        query: ListPaymentsQuery,
    ) -> Result<PaymentPage, ClientError> {
        self.post_signed("payments/search", query).await
    }

    /// `GET /api/v1/payments/{payment_id}` – read back a payment.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentView, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/payments/{payment_id}"))?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp).await
    }
}

impl StoreClient {
    async fn post_signed<B, T>(&self, path: &str, body: B) -> Result<T, ClientError>
    where
        B: serde::Serialize,
        T: serde::de::DeserializeOwned,
    {
        let signed = SignedBody::new(body, &self.key)?;

        let url = self
            .base_url
            .join(&format!("/api/v1/stores/{}/{path}", self.store_id))?;

        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
