//! Webhook signature verification helper.

use crate::objects::PaymentUpdateEvent;
use crate::signature::{SignatureError, SignedBody, SigningKey};

/// Verify and deserialize an incoming paywatch webhook.
///
/// * `signature_header` – value of the `X-Signature` request header.
/// * `body` – raw JSON request body string.
/// * `secret_hex` – the store's webhook secret as shown in its settings.
///
/// # Example
///
/// ```ignore
/// use paywatch_sdk::client::verify_webhook;
///
/// let event = verify_webhook(signature_header, &body, webhook_secret)?;
/// println!("{} is now {}", event.payment_id, event.status);
/// ```
pub fn verify_webhook(
    signature_header: &str,
    body: &str,
    secret_hex: &str,
) -> Result<PaymentUpdateEvent, SignatureError> {
    let key = SigningKey::from_hex(secret_hex)?;
    SignedBody::<PaymentUpdateEvent>::from_header_and_body(signature_header, body.to_owned())?
        .verify(&key)
}
