//! TOML file configuration structures.
//!
//! These structs directly map to the `paywatch-config.toml` file format.

use paywatch_core::config::Network;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Wallet gateway and chain daemon endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub gateway_url: Url,
    pub daemon_url: Url,
    pub network: Network,
    #[serde(default = "default_request_timeout_millis")]
    pub request_timeout_millis: u64,
}

fn default_request_timeout_millis() -> u64 {
    10_000
}

/// Payment acceptance policy. Reloaded on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_max_ttl_minutes")]
    pub max_ttl_minutes: u32,
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            max_ttl_minutes: default_max_ttl_minutes(),
            min_confirmations: default_min_confirmations(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_max_ttl_minutes() -> u32 {
    60
}

fn default_min_confirmations() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    60
}

/// Outbound webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout_millis")]
    pub timeout_millis: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_millis: default_webhook_timeout_millis(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_webhook_timeout_millis() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    32
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}
