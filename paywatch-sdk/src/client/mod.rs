//! Clients for the paywatch HTTP and live status endpoints.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest` or `tokio-tungstenite`.

mod live;
mod store;
mod webhook;

pub use live::watch_payment_status;
pub use store::StoreClient;
pub use webhook::verify_webhook;

use reqwest::StatusCode;

use crate::objects::ParseStatusError;
use crate::signature::SignatureError;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HMAC signature could not be computed or verified.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The live status frame did not carry a known status.
    #[error("unexpected status frame: {0}")]
    Frame(#[from] ParseStatusError),

    /// The live status connection closed before any status frame.
    #[error("connection closed without a status")]
    ClosedWithoutStatus,

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
