//! Store payment API handlers.
//!
//! # Endpoints
//!
//! - `POST /stores/{store_id}/payments`        – open a new pending payment (signed body)
//! - `POST /stores/{store_id}/payments/lookup` – fetch several payments by id (signed body)
//! - `POST /stores/{store_id}/payments/search` – one page of the store's payments (signed body)
//! - `GET  /payments/{payment_id}`             – read back a payment

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use paywatch_core::entities::payments::{PaymentFilter, PaymentSortKey as DbSortKey};
use paywatch_sdk::objects::{
    CreatePaymentRequest, ListPaymentsQuery, PaymentLookupRequest, PaymentPage, PaymentSortKey,
    SortOrder, total_pages,
};

use super::{ApiError, payment_view};
use crate::api::extractors::StoreSignedBody;
use crate::state::AppState;

/// Build the store payment API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stores/{store_id}/payments", post(create_payment))
        .route("/stores/{store_id}/payments/lookup", post(lookup_payments))
        .route("/stores/{store_id}/payments/search", post(search_payments))
        .route("/payments/{payment_id}", get(get_payment))
}

/// `POST /stores/{store_id}/payments` — open a new pending payment.
///
/// Draws a fresh integrated address from the store's wallet, persists the
/// payment as `pending` and starts watching it.
async fn create_payment(
    State(state): State<AppState>,
    StoreSignedBody { store_id, body }: StoreSignedBody<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.atomic_amount == 0 {
        return Err(ApiError::InvalidAmount);
    }

    let record = state
        .registry
        .open_payment(store_id, body.atomic_amount)
        .await?;

    let policy = state.config.policy.read().await.clone();
    let view = payment_view(&record, &policy, time::OffsetDateTime::now_utc());
    Ok((StatusCode::CREATED, Json(view)))
}

/// `POST /stores/{store_id}/payments/lookup` — fetch several payments of
/// the store. Ids of other stores or unknown ids are left out; 404 when none
/// is left.
async fn lookup_payments(
    State(state): State<AppState>,
    StoreSignedBody { store_id, body }: StoreSignedBody<PaymentLookupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.payment_ids.is_empty() {
        return Err(ApiError::NoPaymentIds);
    }

    let records = state
        .store()
        .payments_by_ids(store_id, &body.payment_ids)
        .await?;
    if records.is_empty() {
        return Err(ApiError::NotFound);
    }

    let policy = state.config.policy.read().await.clone();
    let now = time::OffsetDateTime::now_utc();
    let views: Vec<_> = records
        .iter()
        .map(|record| payment_view(record, &policy, now))
        .collect();
    Ok(Json(views))
}

/// `POST /stores/{store_id}/payments/search` — one page of the store's
/// payments, optionally filtered by status.
///
/// 404 when the filter matches nothing or the page lies past the last one.
async fn search_payments(
    State(state): State<AppState>,
    StoreSignedBody { store_id, body }: StoreSignedBody<ListPaymentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = payment_filter(&body).ok_or(ApiError::InvalidPage)?;

    let listing = state.store().list_payments(store_id, filter).await?;
    let total_pages = total_pages(listing.total, filter.limit);
    if body.page > total_pages {
        return Err(ApiError::NotFound);
    }

    let policy = state.config.policy.read().await.clone();
    let now = time::OffsetDateTime::now_utc();
    Ok(Json(PaymentPage {
        limit: filter.limit,
        page: body.page,
        total_payments: listing.total,
        total_pages,
        payments: listing
            .payments
            .iter()
            .map(|record| payment_view(record, &policy, now))
            .collect(),
    }))
}

/// `None` when the requested page is below 1.
fn payment_filter(query: &ListPaymentsQuery) -> Option<PaymentFilter> {
    Some(PaymentFilter {
        status: query.status.map(Into::into),
        sort_by: match query.sort_by {
            PaymentSortKey::CreationTime => DbSortKey::CreationTime,
            PaymentSortKey::AtomicAmount => DbSortKey::AtomicAmount,
        },
        descending: query.order == SortOrder::Desc,
        limit: query.clamped_limit(),
        offset: query.offset()?,
    })
}

/// `GET /payments/{payment_id}` — read back a payment.
async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store()
        .payment_by_id(&payment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let policy = state.config.policy.read().await.clone();
    Ok(Json(payment_view(
        &record,
        &policy,
        time::OffsetDateTime::now_utc(),
    )))
}
