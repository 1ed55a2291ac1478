//! Payment status vocabulary and the payment read-back view.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of decimal places between one coin and one atomic unit.
pub const ATOMIC_UNIT_SCALE: u32 = 12;

/// Status of a payment.
///
/// A payment starts `Pending` and moves exactly once to one of the three
/// terminal statuses. It never leaves a terminal status.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `paywatch-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Error,
}

impl PaymentStatus {
    /// The literal used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Error => "error",
        }
    }

    /// Returns `true` for `paid`, `expired` and `error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four status literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "expired" => Ok(PaymentStatus::Expired),
            "error" => Ok(PaymentStatus::Error),
            other => Err(ParseStatusError(other.to_owned())),
        }
    }
}

/// Convert an atomic amount into a coin amount with [`ATOMIC_UNIT_SCALE`] decimals.
pub fn atomic_to_decimal(atomic: u64) -> Decimal {
    Decimal::from_i128_with_scale(atomic as i128, ATOMIC_UNIT_SCALE)
}

/// Body of `POST /api/v1/stores/{store_id}/payments`.
///
/// The raw JSON bytes of this body are what the store signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub atomic_amount: u64,
}

/// A payment as reported by the read-back endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    #[serde(rename = "paymentID")]
    pub payment_id: String,
    pub status: PaymentStatus,
    pub atomic_amount: u64,
    /// `atomic_amount` rendered in whole coins.
    pub amount: Decimal,
    pub integrated_address: String,
    /// Unix timestamp in seconds.
    pub creation_time: i64,
    /// Minutes left before the payment may expire, `0` once terminal.
    pub ttl: i64,
}

/// Body of `POST /api/v1/stores/{store_id}/payments/lookup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLookupRequest {
    #[serde(rename = "paymentIDs")]
    pub payment_ids: Vec<String>,
}

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 200;

/// Column a payment listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSortKey {
    #[default]
    CreationTime,
    AtomicAmount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Body of `POST /api/v1/stores/{store_id}/payments/search`.
///
/// Pages are numbered from 1. `limit` is clamped to `1..=200`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsQuery {
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub sort_by: PaymentSortKey,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

impl Default for ListPaymentsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
            sort_by: PaymentSortKey::default(),
            order: SortOrder::default(),
            status: None,
        }
    }
}

fn default_page_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

fn default_page() -> i64 {
    1
}

impl ListPaymentsQuery {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    /// Rows to skip before this page, `None` when `page` is below 1.
    pub fn offset(&self) -> Option<i64> {
        if self.page < 1 {
            return None;
        }
        (self.page - 1).checked_mul(self.clamped_limit())
    }
}

/// Number of pages of `limit` items needed for `total` items.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// One page of a store's payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    pub limit: i64,
    pub page: i64,
    pub total_payments: i64,
    pub total_pages: i64,
    pub payments: Vec<PaymentView>,
}

/// Admin view of a store's wallet context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreWalletStatus {
    pub store_id: i32,
    pub active: bool,
    pub polling: bool,
    pub pending_payments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Expired,
            PaymentStatus::Error,
        ] {
            assert_eq!(status.to_string().parse::<PaymentStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("cancelled".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_only_pending_is_not_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
        assert!(PaymentStatus::Error.is_terminal());
    }

    #[test]
    fn test_atomic_to_decimal() {
        assert_eq!(atomic_to_decimal(1_000_000_000_000).to_string(), "1.000000000000");
        assert_eq!(atomic_to_decimal(1).to_string(), "0.000000000001");
    }

    #[test]
    fn test_list_query_defaults_and_paging() {
        let query: ListPaymentsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, ListPaymentsQuery::default());
        assert_eq!(query.offset(), Some(0));

        let query: ListPaymentsQuery = serde_json::from_str(
            r#"{"limit":500,"page":3,"sortBy":"atomic_amount","order":"asc","status":"paid"}"#,
        )
        .unwrap();
        assert_eq!(query.clamped_limit(), 200);
        assert_eq!(query.offset(), Some(400));
        assert_eq!(query.sort_by, PaymentSortKey::AtomicAmount);
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.status, Some(PaymentStatus::Paid));

        let page_zero = ListPaymentsQuery {
            page: 0,
            ..Default::default()
        };
        assert_eq!(page_zero.offset(), None);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(41, 20), 3);
    }

    #[test]
    fn test_payment_view_field_names() {
        let view = PaymentView {
            payment_id: "ab".into(),
            status: PaymentStatus::Pending,
            atomic_amount: 5,
            amount: atomic_to_decimal(5),
            integrated_address: "dETi".into(),
            creation_time: 0,
            ttl: 60,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["paymentID"], "ab");
        assert_eq!(json["atomicAmount"], 5);
        assert_eq!(json["integratedAddress"], "dETi");
        assert_eq!(json["status"], "pending");
    }
}
