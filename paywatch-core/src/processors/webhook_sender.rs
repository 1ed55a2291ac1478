//! WebhookSender processor.
//!
//! The WebhookSender is responsible for:
//! - Receiving `WebhookDelivery` jobs from the queue
//! - Signing the event body with the store's webhook secret
//! - POSTing it with the `X-Signature` header, bounded by a short timeout
//! - Logging the outcome
//!
//! Delivery is one-shot. A failed or slow receiver is logged and forgotten.

use super::notifier::{WebhookDelivery, WebhookDeliveryReceiver};
use crate::config::WebhookConfig;
use paywatch_sdk::signature::{SIGNATURE_HEADER, SignatureError, SignedBody, SigningKey};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

/// Hard cap on concurrent deliveries regardless of configuration.
const MAX_IN_FLIGHT_LIMIT: usize = 1024;

/// Errors that can occur during webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The store's webhook secret is unusable
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error, including timeouts
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The receiver answered with a non-success status
    #[error("webhook delivery failed with status {status}")]
    DeliveryFailed { status: u16 },
}

/// WebhookSender delivers queued webhook events to store endpoints.
pub struct WebhookSender {
    webhook_rx: WebhookDeliveryReceiver,
    shutdown_rx: watch::Receiver<bool>,
    http_client: reqwest::Client,
    in_flight: Arc<Semaphore>,
    max_in_flight: u32,
}

impl WebhookSender {
    /// Create a new WebhookSender.
    ///
    /// # Arguments
    ///
    /// * `webhook_rx` - Receiver of the delivery queue
    /// * `shutdown_rx` - Receiver for shutdown signal
    /// * `config` - Timeout and concurrency limits
    pub fn new(
        webhook_rx: WebhookDeliveryReceiver,
        shutdown_rx: watch::Receiver<bool>,
        config: &WebhookConfig,
    ) -> Self {
        let max_in_flight = config.max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
        Self {
            webhook_rx,
            shutdown_rx,
            http_client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight: max_in_flight as u32,
        }
    }

    /// Run the WebhookSender.
    ///
    /// On shutdown the queue is closed and whatever is already in it is still
    /// delivered, so the `error` events sent during shutdown reconciliation go
    /// out before the process exits.
    pub async fn run(mut self) {
        info!("WebhookSender started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("WebhookSender received shutdown signal");
                        break;
                    }
                }

                Some(delivery) = self.webhook_rx.recv() => {
                    self.dispatch(delivery).await;
                }

                else => {
                    info!("Webhook delivery channel closed");
                    break;
                }
            }
        }

        self.webhook_rx.close();
        while let Some(delivery) = self.webhook_rx.recv().await {
            self.dispatch(delivery).await;
        }
        // Every permit back means every spawned delivery has finished.
        let _ = self.in_flight.acquire_many(self.max_in_flight).await;

        info!("WebhookSender shutdown complete");
    }

    async fn dispatch(&self, delivery: WebhookDelivery) {
        let Ok(permit) = Arc::clone(&self.in_flight).acquire_owned().await else {
            return;
        };
        let client = self.http_client.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let payment_id = delivery.event.payment_id.as_str();
            let status = delivery.event.status;
            match deliver(&client, &delivery).await {
                Ok(()) => debug!(payment_id, %status, "Webhook delivered"),
                Err(e) => warn!(
                    payment_id,
                    %status,
                    url = %delivery.target.url,
                    error = %e,
                    "Webhook delivery failed"
                ),
            }
        });
    }
}

/// Sign and POST one event.
pub async fn deliver(
    client: &reqwest::Client,
    delivery: &WebhookDelivery,
) -> Result<(), WebhookError> {
    let key = SigningKey::from_hex(&delivery.target.secret_hex)?;
    let signed = SignedBody::new(delivery.event.clone(), &key)?;
    let response = client
        .post(&delivery.target.url)
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, signed.to_header())
        .body(signed.json)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(WebhookError::DeliveryFailed {
            status: status.as_u16(),
        })
    }
}
