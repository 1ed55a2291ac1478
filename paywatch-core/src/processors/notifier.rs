//! Fan-out of payment status changes to a store's webhook and to live
//! observers.

use super::live_status::LiveStatusHub;
use paywatch_sdk::objects::{PaymentStatus, PaymentUpdateEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Buffer of the webhook delivery queue.
///
/// Deliveries beyond this are dropped rather than stalling a poll loop.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// A store's webhook endpoint and the hex secret its events are signed with.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: String,
    pub secret_hex: String,
}

impl std::fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTarget")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl WebhookTarget {
    pub fn new(url: impl Into<String>, secret_hex: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret_hex: secret_hex.into(),
        }
    }

    /// A webhook is only called when both the URL and the secret are set.
    pub fn is_set(&self) -> bool {
        !self.url.trim().is_empty() && !self.secret_hex.trim().is_empty()
    }
}

/// One event on its way to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub target: WebhookTarget,
    pub event: PaymentUpdateEvent,
}

pub type WebhookDeliverySender = mpsc::Sender<WebhookDelivery>;
pub type WebhookDeliveryReceiver = mpsc::Receiver<WebhookDelivery>;

pub fn webhook_delivery_channel() -> (WebhookDeliverySender, WebhookDeliveryReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Dispatches a status change without waiting on any receiver.
///
/// Webhook requests are queued for the
/// [`WebhookSender`](super::webhook_sender::WebhookSender); live observers are
/// handed the status directly.
#[derive(Debug, Clone)]
pub struct Notifier {
    webhook_tx: WebhookDeliverySender,
    live: LiveStatusHub,
}

impl Notifier {
    pub fn new(webhook_tx: WebhookDeliverySender, live: LiveStatusHub) -> Self {
        Self { webhook_tx, live }
    }

    pub fn live(&self) -> &LiveStatusHub {
        &self.live
    }

    pub async fn notify(&self, payment_id: &str, status: PaymentStatus, webhook: &WebhookTarget) {
        if webhook.is_set() {
            let delivery = WebhookDelivery {
                target: webhook.clone(),
                event: PaymentUpdateEvent::new(payment_id, status),
            };
            match self.webhook_tx.try_send(delivery) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(payment_id, %status, "Webhook queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(payment_id, %status, "Webhook sender stopped, dropping event");
                }
            }
        }
        let observers = self.live.publish(payment_id, status).await;
        debug!(payment_id, %status, observers, "Dispatched status change");
    }
}
