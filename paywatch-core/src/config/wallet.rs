//! Wallet gateway configuration.

use url::Url;

/// The chain network the daemon must be running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Where the view-only wallets and the chain daemon are reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletGatewayConfig {
    /// JSON-RPC endpoint that hosts the per-store view-only wallets.
    pub gateway_url: Url,
    /// JSON-RPC endpoint of the chain daemon.
    pub daemon_url: Url,
    pub network: Network,
    /// Timeout applied to every RPC call.
    pub request_timeout: std::time::Duration,
}
