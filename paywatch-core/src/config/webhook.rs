//! Webhook delivery configuration.

/// Settings for outbound webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Per-request timeout. A receiver that does not answer in time is
    /// given up on; there is no retry.
    pub timeout: std::time::Duration,
    /// Upper bound on concurrently running deliveries.
    pub max_in_flight: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: std::time::Duration::from_millis(1000),
            max_in_flight: 32,
        }
    }
}
