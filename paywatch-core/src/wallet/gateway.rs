//! JSON-RPC client for the wallet gateway and the chain daemon.
//!
//! Both endpoints speak JSON-RPC 2.0 over `POST {base}/json_rpc`. Every store
//! wallet lives in the gateway under its own file name.
//!
//! | method                  | params                                   | result                                  |
//! |-------------------------|------------------------------------------|-----------------------------------------|
//! | `open_view_only_wallet` | `filename`, `view_key`, `password`       | `{}`                                    |
//! | `get_height`            | `filename`                               | `{height}`                              |
//! | `get_payments`          | `filename`, `payment_id`                 | `{payments: [{amount, block_height}]}`  |
//! | `make_integrated_address` | `filename`                             | `{integrated_address, payment_id}`      |
//! | `set_online`            | `filename`, `start_height`               | `{}`                                    |
//! | `set_offline`           | `filename`                               | `{}`                                    |
//! | `clean_wallet`          | `filename`                               | `{}`                                    |
//! | `close_wallet`          | `filename`                               | `{}`                                    |
//! | `get_info` (daemon)     |                                          | `{height, topoheight, testnet}`         |

use super::{Deposit, IntegratedAddress, WalletError, WalletFactory, WalletHandle};
use crate::config::{Network, WalletGatewayConfig};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Serialize)]
struct WalletParams<'a> {
    filename: &'a str,
}

#[derive(Serialize)]
struct OpenParams<'a> {
    filename: &'a str,
    view_key: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PaymentsParams<'a> {
    filename: &'a str,
    payment_id: &'a str,
}

#[derive(Serialize)]
struct OnlineParams<'a> {
    filename: &'a str,
    start_height: u64,
}

#[derive(Deserialize)]
struct HeightResult {
    height: u64,
}

#[derive(Deserialize)]
struct PaymentsResult {
    #[serde(default)]
    payments: Vec<Deposit>,
}

/// Daemon status as reported by `get_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DaemonInfo {
    pub height: u64,
    #[serde(default)]
    pub topoheight: u64,
    /// Absent when the daemon does not say which network it runs on.
    #[serde(default)]
    pub testnet: Option<bool>,
}

impl DaemonInfo {
    pub fn network(&self) -> Option<Network> {
        self.testnet.map(|testnet| {
            if testnet {
                Network::Testnet
            } else {
                Network::Mainnet
            }
        })
    }

    /// A daemon that reports no network never matches.
    pub fn ensure_network(&self, expected: Network) -> Result<(), WalletError> {
        match self.network() {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(WalletError::NetworkMismatch { expected, actual }),
            None => Err(WalletError::UnknownNetwork { expected }),
        }
    }
}

#[derive(Debug)]
struct RpcClient {
    http: reqwest::Client,
    gateway_endpoint: Url,
    daemon_endpoint: Url,
}

impl RpcClient {
    async fn call<P, R>(&self, endpoint: &Url, method: &'static str, params: P) -> Result<R, WalletError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "0",
            method,
            params,
        };
        let response: RpcResponse<R> = self
            .http
            .post(endpoint.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(WalletError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(WalletError::MalformedResponse(method)),
        }
    }

    async fn wallet_call<P, R>(&self, method: &'static str, params: P) -> Result<R, WalletError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        self.call(&self.gateway_endpoint, method, params).await
    }

    async fn daemon_info(&self) -> Result<DaemonInfo, WalletError> {
        self.call(&self.daemon_endpoint, "get_info", serde_json::Value::Null)
            .await
    }
}

fn json_rpc_endpoint(base: &Url) -> Result<Url, WalletError> {
    Ok(base.join("json_rpc")?)
}

/// Fail when the daemon runs on a different network than configured.
///
/// The server runs this once before serving; a mismatch is fatal there.
pub async fn check_daemon_network(config: &WalletGatewayConfig) -> Result<DaemonInfo, WalletError> {
    let client = RpcClient {
        http: reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?,
        gateway_endpoint: json_rpc_endpoint(&config.gateway_url)?,
        daemon_endpoint: json_rpc_endpoint(&config.daemon_url)?,
    };
    let info = client.daemon_info().await?;
    info.ensure_network(config.network)?;
    info!(height = info.height, network = %config.network, "Daemon reachable");
    Ok(info)
}

/// [`WalletFactory`] backed by the JSON-RPC wallet gateway.
#[derive(Debug, Clone)]
pub struct WalletGateway {
    rpc: Arc<RpcClient>,
}

impl WalletGateway {
    pub fn new(config: &WalletGatewayConfig) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            rpc: Arc::new(RpcClient {
                http,
                gateway_endpoint: json_rpc_endpoint(&config.gateway_url)?,
                daemon_endpoint: json_rpc_endpoint(&config.daemon_url)?,
            }),
        })
    }
}

#[async_trait]
impl WalletFactory for WalletGateway {
    async fn open(
        &self,
        store_id: i32,
        view_key: &str,
    ) -> Result<Arc<dyn WalletHandle>, WalletError> {
        let view_key = view_key.trim();
        if view_key.is_empty() || hex::decode(view_key).is_err() {
            return Err(WalletError::InvalidViewKey);
        }
        // The wallet file only lives for this process; nobody needs to reopen it.
        let password = hex::encode(rand::random::<[u8; 32]>());
        let filename = format!("store-{store_id}");
        self.rpc
            .wallet_call::<_, serde_json::Value>(
                "open_view_only_wallet",
                OpenParams {
                    filename: &filename,
                    view_key,
                    password: &password,
                },
            )
            .await?;
        debug!(store_id, filename = %filename, "Opened view-only wallet");
        Ok(Arc::new(GatewayWallet {
            rpc: Arc::clone(&self.rpc),
            filename,
        }))
    }
}

/// One store wallet hosted by the gateway.
#[derive(Debug)]
struct GatewayWallet {
    rpc: Arc<RpcClient>,
    filename: String,
}

impl GatewayWallet {
    fn params(&self) -> WalletParams<'_> {
        WalletParams {
            filename: &self.filename,
        }
    }
}

#[async_trait]
impl WalletHandle for GatewayWallet {
    async fn is_online(&self) -> bool {
        match self.rpc.daemon_info().await {
            Ok(_) => true,
            Err(e) => {
                debug!(wallet = %self.filename, error = %e, "Daemon unreachable");
                false
            }
        }
    }

    async fn deposits_for(&self, payment_id: &str) -> Result<Vec<Deposit>, WalletError> {
        let result: PaymentsResult = self
            .rpc
            .wallet_call(
                "get_payments",
                PaymentsParams {
                    filename: &self.filename,
                    payment_id,
                },
            )
            .await?;
        Ok(result.payments)
    }

    async fn local_height(&self) -> Result<u64, WalletError> {
        let result: HeightResult = self.rpc.wallet_call("get_height", self.params()).await?;
        Ok(result.height)
    }

    async fn daemon_height(&self) -> Result<u64, WalletError> {
        Ok(self.rpc.daemon_info().await?.height)
    }

    async fn set_online(&self) -> Result<(), WalletError> {
        // Scan from the current tip: every payment watched by this wallet was
        // created after it went online.
        let info = self.rpc.daemon_info().await?;
        self.rpc
            .wallet_call::<_, serde_json::Value>(
                "set_online",
                OnlineParams {
                    filename: &self.filename,
                    start_height: info.topoheight,
                },
            )
            .await?;
        Ok(())
    }

    async fn set_offline(&self) {
        if let Err(e) = self
            .rpc
            .wallet_call::<_, serde_json::Value>("set_offline", self.params())
            .await
        {
            warn!(wallet = %self.filename, error = %e, "Failed to set wallet offline");
        }
    }

    async fn release(&self) {
        if let Err(e) = self
            .rpc
            .wallet_call::<_, serde_json::Value>("clean_wallet", self.params())
            .await
        {
            warn!(wallet = %self.filename, error = %e, "Failed to clean wallet");
        }
    }

    async fn close(&self) {
        if let Err(e) = self
            .rpc
            .wallet_call::<_, serde_json::Value>("close_wallet", self.params())
            .await
        {
            warn!(wallet = %self.filename, error = %e, "Failed to close wallet");
        }
    }

    async fn new_integrated_address(&self) -> Result<IntegratedAddress, WalletError> {
        self.rpc
            .wallet_call("make_integrated_address", self.params())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_response_prefers_error() {
        let response: RpcResponse<HeightResult> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"0","error":{"code":-13,"message":"No wallet file"}}"#,
        )
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -13);
    }

    #[test]
    fn test_payments_result_parses_deposits() {
        let result: PaymentsResult = serde_json::from_str(
            r#"{"payments":[{"amount":1000000000000,"block_height":120,"tx_hash":"ab"}]}"#,
        )
        .unwrap();
        assert_eq!(
            result.payments,
            vec![Deposit {
                amount: 1_000_000_000_000,
                height: 120
            }]
        );

        let empty: PaymentsResult = serde_json::from_str("{}").unwrap();
        assert!(empty.payments.is_empty());
    }

    #[test]
    fn test_daemon_info_network() {
        let info: DaemonInfo =
            serde_json::from_str(r#"{"height":10,"topoheight":12,"testnet":true}"#).unwrap();
        assert_eq!(info.network(), Some(Network::Testnet));
        assert!(info.ensure_network(Network::Testnet).is_ok());

        let info: DaemonInfo =
            serde_json::from_str(r#"{"height":10,"testnet":false}"#).unwrap();
        assert_eq!(info.network(), Some(Network::Mainnet));
        assert!(matches!(
            info.ensure_network(Network::Testnet),
            Err(WalletError::NetworkMismatch {
                expected: Network::Testnet,
                actual: Network::Mainnet,
            })
        ));
    }

    #[test]
    fn test_daemon_without_network_never_matches() {
        let info: DaemonInfo = serde_json::from_str(r#"{"height":10}"#).unwrap();
        assert_eq!(info.network(), None);
        for expected in [Network::Mainnet, Network::Testnet] {
            assert!(matches!(
                info.ensure_network(expected),
                Err(WalletError::UnknownNetwork { expected: e }) if e == expected
            ));
        }
    }

    #[test]
    fn test_json_rpc_endpoint() {
        let base = Url::parse("http://127.0.0.1:20209").unwrap();
        assert_eq!(
            json_rpc_endpoint(&base).unwrap().as_str(),
            "http://127.0.0.1:20209/json_rpc"
        );
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_view_key() {
        let gateway = WalletGateway::new(&WalletGatewayConfig {
            gateway_url: Url::parse("http://127.0.0.1:9").unwrap(),
            daemon_url: Url::parse("http://127.0.0.1:9").unwrap(),
            network: Network::Mainnet,
            request_timeout: std::time::Duration::from_millis(100),
        })
        .unwrap();
        assert!(matches!(
            gateway.open(1, "not a key").await,
            Err(WalletError::InvalidViewKey)
        ));
        assert!(matches!(
            gateway.open(1, "").await,
            Err(WalletError::InvalidViewKey)
        ));
    }
}
