//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use paywatch_core::processors::{LiveStatusHub, StoreWalletRegistry};
use paywatch_core::store::PaymentStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Store wallet contexts and the payments they watch.
    pub registry: Arc<StoreWalletRegistry>,
    /// Observers waiting on live status pushes.
    pub live: LiveStatusHub,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(
        registry: Arc<StoreWalletRegistry>,
        live: LiveStatusHub,
        config: SharedConfig,
    ) -> Self {
        Self {
            registry,
            live,
            config,
        }
    }

    /// The persisted payments, shared with the watchers.
    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.registry.deps().store
    }
}
