//! Observers waiting for a payment to leave `pending`.
//!
//! The WebSocket status endpoint subscribes one observer per connection. When
//! the payment changes status every observer receives it once, and the
//! registration is gone afterwards.

use paywatch_sdk::objects::PaymentStatus;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

type Observers = SmallVec<[oneshot::Sender<PaymentStatus>; 1]>;

#[derive(Debug, Clone, Default)]
pub struct LiveStatusHub {
    observers: Arc<Mutex<HashMap<String, Observers>>>,
}

/// Resolves with the next status of the payment it was subscribed to.
pub type StatusObserver = oneshot::Receiver<PaymentStatus>;

impl LiveStatusHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, payment_id: &str) -> StatusObserver {
        let (tx, rx) = oneshot::channel();
        self.observers
            .lock()
            .await
            .entry(payment_id.to_owned())
            .or_default()
            .push(tx);
        rx
    }

    /// Hand `status` to every observer of `payment_id` and forget them.
    /// Returns how many observers were still listening.
    pub async fn publish(&self, payment_id: &str, status: PaymentStatus) -> usize {
        let Some(observers) = self.observers.lock().await.remove(payment_id) else {
            return 0;
        };
        let delivered = observers
            .into_iter()
            .filter_map(|tx| tx.send(status).ok())
            .count();
        debug!(payment_id, %status, delivered, "Published live status");
        delivered
    }

    /// Drop observers of `payment_id` whose connection went away.
    pub async fn prune(&self, payment_id: &str) {
        let mut observers = self.observers.lock().await;
        if let Some(list) = observers.get_mut(payment_id) {
            list.retain(|tx| !tx.is_closed());
            if list.is_empty() {
                observers.remove(payment_id);
            }
        }
    }

    pub async fn observer_count(&self, payment_id: &str) -> usize {
        self.observers
            .lock()
            .await
            .get(payment_id)
            .map_or(0, |list| list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_observer_once() {
        let hub = LiveStatusHub::new();
        let first = hub.subscribe("p").await;
        let second = hub.subscribe("p").await;
        let other = hub.subscribe("q").await;

        assert_eq!(hub.publish("p", PaymentStatus::Paid).await, 2);
        assert_eq!(first.await.unwrap(), PaymentStatus::Paid);
        assert_eq!(second.await.unwrap(), PaymentStatus::Paid);

        assert_eq!(hub.observer_count("p").await, 0);
        assert_eq!(hub.publish("p", PaymentStatus::Error).await, 0);
        assert_eq!(hub.observer_count("q").await, 1);
        drop(other);
    }

    #[tokio::test]
    async fn test_prune_drops_closed_observers() {
        let hub = LiveStatusHub::new();
        let gone = hub.subscribe("p").await;
        let kept = hub.subscribe("p").await;
        drop(gone);

        hub.prune("p").await;
        assert_eq!(hub.observer_count("p").await, 1);

        drop(kept);
        hub.prune("p").await;
        assert_eq!(hub.observer_count("p").await, 0);
    }
}
