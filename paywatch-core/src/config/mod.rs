//! Runtime configuration types for paywatch.
//!
//! These are the validated values the watcher runs with. Loading and parsing
//! the config file is handled by the server crate.

mod policy;
mod wallet;
mod webhook;

pub use policy::{PaymentPolicy, SharedPolicy, WatcherConfig};
pub use wallet::{Network, WalletGatewayConfig};
pub use webhook::WebhookConfig;
