//! HTTP API handlers.
//!
//! - `/api/v1` – store payment endpoints, see [`payments`]
//! - `/ws`     – live status push, see [`ws`]
//! - `/admin`  – store wallet administration, see [`admin`]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use paywatch_core::config::PaymentPolicy;
use paywatch_core::entities::payments::PaymentRecord;
use paywatch_core::processors::RegistryError;
use paywatch_core::store::StoreError;
use paywatch_sdk::objects::{PaymentStatus, PaymentView, atomic_to_decimal};
use serde::Serialize;

pub mod admin;
pub mod extractors;
pub mod payments;
pub mod ws;

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    Registry(RegistryError),
    Store(StoreError),
    InvalidAmount,
    NoPaymentIds,
    InvalidPage,
    NotFound,
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Registry(e) => registry_error_response(e),
            ApiError::Store(e) => store_error_response(e),
            ApiError::InvalidAmount => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "atomicAmount must be a positive integer",
            ),
            ApiError::NoPaymentIds => {
                error_response(StatusCode::BAD_REQUEST, "no payment ids submitted")
            }
            ApiError::InvalidPage => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "page must be at least 1")
            }
            ApiError::NotFound => error_response(StatusCode::NOT_FOUND, "resource not found"),
        }
    }
}

fn registry_error_response(e: RegistryError) -> Response {
    match e {
        RegistryError::UnknownStore(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        RegistryError::WalletOffline(_) => {
            tracing::warn!(error = %e, "Refusing request, wallet daemon offline");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        RegistryError::WalletBusy(_)
        | RegistryError::WalletClosed(_)
        | RegistryError::DuplicatePayment(_) => error_response(StatusCode::CONFLICT, e.to_string()),
        RegistryError::WalletCreation { .. } | RegistryError::Wallet(_) => {
            tracing::error!(error = %e, "API wallet error");
            error_response(StatusCode::BAD_GATEWAY, "wallet gateway error")
        }
        RegistryError::Store(e) => store_error_response(e),
    }
}

fn store_error_response(e: StoreError) -> Response {
    match e {
        StoreError::AddressTaken => error_response(StatusCode::CONFLICT, e.to_string()),
        StoreError::AmountOutOfRange(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        StoreError::Database(_) => {
            tracing::error!(error = %e, "API database error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Render a persisted payment for the store API.
///
/// `ttl` counts the whole minutes left while the payment is pending and is
/// `0` once it reached a terminal status.
pub(crate) fn payment_view(
    record: &PaymentRecord,
    policy: &PaymentPolicy,
    now: time::OffsetDateTime,
) -> PaymentView {
    let status: PaymentStatus = record.status.into();
    let atomic_amount = u64::try_from(record.atomic_amount).unwrap_or_default();
    let ttl = if status.is_terminal() {
        0
    } else {
        policy.remaining_ttl_minutes(record.creation_time, now)
    };
    PaymentView {
        payment_id: record.payment_id.clone(),
        status,
        atomic_amount,
        amount: atomic_to_decimal(atomic_amount),
        integrated_address: record.integrated_address.clone(),
        creation_time: record.creation_time.unix_timestamp(),
        ttl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paywatch_core::entities::PaymentStatus as DbPaymentStatus;
    use paywatch_core::wallet::WalletError;
    use time::macros::datetime;

    fn record(status: DbPaymentStatus) -> PaymentRecord {
        PaymentRecord {
            payment_id: "a1b2c3d4".into(),
            status,
            atomic_amount: 1_500_000_000_000,
            integrated_address: "detoi1qxyz".into(),
            store_id: 3,
            creation_time: datetime!(2024-05-01 12:00 UTC),
        }
    }

    #[test]
    fn test_payment_view_pending_counts_down_ttl() {
        let policy = PaymentPolicy::default();
        let view = payment_view(
            &record(DbPaymentStatus::Pending),
            &policy,
            datetime!(2024-05-01 12:20:30 UTC),
        );
        assert_eq!(view.status, PaymentStatus::Pending);
        assert_eq!(view.ttl, 40);
        assert_eq!(view.atomic_amount, 1_500_000_000_000);
        assert_eq!(view.amount.to_string(), "1.500000000000");
        assert_eq!(view.creation_time, 1_714_564_800);
    }

    #[test]
    fn test_payment_view_terminal_has_zero_ttl() {
        let policy = PaymentPolicy::default();
        let view = payment_view(
            &record(DbPaymentStatus::Paid),
            &policy,
            datetime!(2024-05-01 12:01 UTC),
        );
        assert_eq!(view.status, PaymentStatus::Paid);
        assert_eq!(view.ttl, 0);

        let late = payment_view(
            &record(DbPaymentStatus::Pending),
            &policy,
            datetime!(2024-05-01 14:00 UTC),
        );
        assert_eq!(late.ttl, 0);
    }

    #[test]
    fn test_registry_errors_map_to_status_codes() {
        let cases = [
            (RegistryError::UnknownStore(1), StatusCode::NOT_FOUND),
            (RegistryError::WalletOffline(1), StatusCode::SERVICE_UNAVAILABLE),
            (RegistryError::WalletBusy(1), StatusCode::CONFLICT),
            (
                RegistryError::DuplicatePayment("p".into()),
                StatusCode::CONFLICT,
            ),
            (
                RegistryError::Store(StoreError::AddressTaken),
                StatusCode::CONFLICT,
            ),
            (
                RegistryError::Store(StoreError::AmountOutOfRange(u64::MAX)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                RegistryError::Wallet(WalletError::MalformedResponse("height")),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_store_errors_map_to_status_codes() {
        let cases = [
            (StoreError::AddressTaken, StatusCode::CONFLICT),
            (
                StoreError::AmountOutOfRange(u64::MAX),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
