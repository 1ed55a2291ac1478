//! The per-store wallet the watcher observes.
//!
//! Key handling, address derivation and chain synchronization all happen in
//! an external wallet process. The watcher only asks it for heights and for
//! the deposits that carry a given payment identifier.

mod gateway;

pub use gateway::{DaemonInfo, WalletGateway, check_daemon_network};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response to `{0}`")]
    MalformedResponse(&'static str),
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("view key is not valid hex")]
    InvalidViewKey,
    #[error("daemon runs on {actual}, expected {expected}")]
    NetworkMismatch {
        expected: crate::config::Network,
        actual: crate::config::Network,
    },
    #[error("daemon did not report its network, expected {expected}")]
    UnknownNetwork { expected: crate::config::Network },
}

/// A deposit seen by the wallet for one payment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Deposit {
    /// Atomic units received.
    pub amount: u64,
    /// Height of the block that included the deposit.
    #[serde(rename = "block_height")]
    pub height: u64,
}

/// A deposit address that embeds a payment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
pub struct IntegratedAddress {
    #[serde(rename = "integrated_address")]
    pub address: String,
    pub payment_id: String,
}

/// An opened view-only wallet of one store.
#[async_trait]
pub trait WalletHandle: Send + Sync {
    /// Whether the wallet currently reaches its daemon.
    async fn is_online(&self) -> bool;

    async fn deposits_for(&self, payment_id: &str) -> Result<Vec<Deposit>, WalletError>;

    /// Height the wallet has scanned up to.
    async fn local_height(&self) -> Result<u64, WalletError>;

    /// Height of the chain according to the daemon.
    async fn daemon_height(&self) -> Result<u64, WalletError>;

    /// Start scanning new blocks.
    async fn set_online(&self) -> Result<(), WalletError>;

    /// Stop scanning. Failures are logged; the wallet is considered offline
    /// afterwards either way.
    async fn set_offline(&self);

    /// Drop the scan state kept while the wallet was online. The wallet
    /// stays open and can be set online again.
    async fn release(&self);

    /// Close the wallet. The handle is unusable afterwards.
    async fn close(&self);

    /// Produce a fresh random integrated address.
    async fn new_integrated_address(&self) -> Result<IntegratedAddress, WalletError>;
}

/// Opens wallets from the view keys stored per store.
#[async_trait]
pub trait WalletFactory: Send + Sync {
    async fn open(
        &self,
        store_id: i32,
        view_key: &str,
    ) -> Result<Arc<dyn WalletHandle>, WalletError>;
}
