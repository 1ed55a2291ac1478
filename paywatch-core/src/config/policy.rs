//! Payment acceptance policy.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Thresholds every poll uses to decide whether a payment is settled.
///
/// Held behind [`SharedPolicy`] so a config reload takes effect on the next
/// tick of every running poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPolicy {
    /// How long a payment may stay pending before it can expire.
    pub max_ttl: time::Duration,
    /// Confirmations every deposit needs before the amount is trusted.
    pub min_confirmations: u64,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            max_ttl: time::Duration::minutes(60),
            min_confirmations: 10,
        }
    }
}

impl PaymentPolicy {
    /// Remaining lifetime of a payment created at `created_at`, in whole
    /// minutes, clamped at zero.
    pub fn remaining_ttl_minutes(
        &self,
        created_at: time::OffsetDateTime,
        now: time::OffsetDateTime,
    ) -> i64 {
        let elapsed = (now - created_at).whole_minutes();
        (self.max_ttl.whole_minutes() - elapsed).max(0)
    }
}

pub type SharedPolicy = Arc<RwLock<PaymentPolicy>>;

/// Settings of the per-wallet poll loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: std::time::Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(60),
        }
    }
}
