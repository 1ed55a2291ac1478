pub mod payments;
pub mod stores;

use paywatch_sdk::objects::PaymentStatus as SdkPaymentStatus;

/// Payment status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `paywatch_sdk::objects::PaymentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_status")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Error,
}

impl PaymentStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkPaymentStatus::from(*self).fmt(f)
    }
}

impl From<PaymentStatus> for SdkPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Pending => SdkPaymentStatus::Pending,
            PaymentStatus::Paid => SdkPaymentStatus::Paid,
            PaymentStatus::Expired => SdkPaymentStatus::Expired,
            PaymentStatus::Error => SdkPaymentStatus::Error,
        }
    }
}

impl From<SdkPaymentStatus> for PaymentStatus {
    fn from(value: SdkPaymentStatus) -> Self {
        match value {
            SdkPaymentStatus::Pending => PaymentStatus::Pending,
            SdkPaymentStatus::Paid => PaymentStatus::Paid,
            SdkPaymentStatus::Expired => PaymentStatus::Expired,
            SdkPaymentStatus::Error => PaymentStatus::Error,
        }
    }
}
