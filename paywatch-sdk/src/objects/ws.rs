//! Live status push frames.
//!
//! An observer connects to `GET /ws/payment/{payment_id}/status` while the
//! payment is pending. When the payment reaches a terminal status the server
//! sends exactly one text frame holding the bare status literal
//! (`paid`, `expired` or `error`) and closes the connection.
//!
//! If the payment is already terminal when the observer connects, the server
//! sends the current status right away and closes.

use super::payment::{ParseStatusError, PaymentStatus};

/// Path of the live status endpoint for `payment_id`.
pub fn status_path(payment_id: &str) -> String {
    format!("/ws/payment/{payment_id}/status")
}

/// Render the text frame carrying `status`.
pub fn encode_status_frame(status: PaymentStatus) -> &'static str {
    status.as_str()
}

/// Parse a text frame received from the live status endpoint.
pub fn decode_status_frame(frame: &str) -> Result<PaymentStatus, ParseStatusError> {
    frame.trim().parse()
}
