//! Admin API handlers.
//!
//! These endpoints require the `Paywatch-Admin-Authorization` header with the
//! plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET    /stores/{store_id}/wallet`                – wallet context status
//! - `POST   /stores/{store_id}/wallet/refresh-webhook` – reload webhook target
//! - `DELETE /stores/{store_id}/wallet`                – close an idle wallet

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use paywatch_sdk::objects::StoreWalletStatus;

use super::ApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/stores/{store_id}/wallet",
            get(wallet_status).delete(teardown_wallet),
        )
        .route(
            "/stores/{store_id}/wallet/refresh-webhook",
            post(refresh_webhook),
        )
}

/// `GET /stores/{store_id}/wallet` — whether the store's wallet is active,
/// polling, and how many payments it watches.
async fn wallet_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(store_id): Path<i32>,
) -> impl IntoResponse {
    let status = match state.registry.get(store_id).await {
        Some(ctx) => ctx.status().await,
        None => StoreWalletStatus {
            store_id,
            active: false,
            polling: false,
            pending_payments: 0,
        },
    };
    Json(status)
}

/// `POST /stores/{store_id}/wallet/refresh-webhook` — reload the webhook
/// URL and secret of an active wallet after the store record changed.
async fn refresh_webhook(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(store_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if state.registry.refresh_webhook(store_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// `DELETE /stores/{store_id}/wallet` — close the wallet of a store with no
/// pending payments, e.g. before its view key is rotated.
async fn teardown_wallet(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(store_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if state.registry.teardown(store_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
