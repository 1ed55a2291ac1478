//! Webhook payload for payment status change events.

use serde::{Deserialize, Serialize};

use super::PaymentStatus;

/// Event POSTed to a store's webhook URL when a payment leaves `pending`.
///
/// ```json
/// {"paymentID":"3f5a...","status":"paid"}
/// ```
///
/// The exact serialized bytes are signed, see [`crate::signature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdateEvent {
    #[serde(rename = "paymentID")]
    pub payment_id: String,
    pub status: PaymentStatus,
}

impl PaymentUpdateEvent {
    pub fn new(payment_id: impl Into<String>, status: PaymentStatus) -> Self {
        Self {
            payment_id: payment_id.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = PaymentUpdateEvent::new("00ff", PaymentStatus::Expired);
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"paymentID":"00ff","status":"expired"}"#
        );
    }
}
