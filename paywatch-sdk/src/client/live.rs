//! Live status watcher (customer page → paywatch server).

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::ClientError;
use crate::objects::PaymentStatus;
use crate::objects::ws::{decode_status_frame, status_path};

/// Connect to the live status endpoint and wait for the single status frame.
///
/// `base_url` uses a `ws://` or `wss://` scheme. Returns when the server
/// pushes the status, which it does once the payment leaves `pending` (or
/// immediately if it already has).
pub async fn watch_payment_status(
    base_url: &Url,
    payment_id: &str,
) -> Result<PaymentStatus, ClientError> {
    let url = base_url.join(&status_path(payment_id))?;
    let (mut stream, _) = connect_async(url.as_str()).await?;

    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => return Ok(decode_status_frame(text.as_str())?),
            Message::Close(_) => break,
            _ => continue,
        }
    }

    Err(ClientError::ClosedWithoutStatus)
}
