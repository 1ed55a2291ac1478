//! Configuration module for paywatch-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AdminConfig, SharedConfig};
use paywatch_core::config::{PaymentPolicy, WalletGatewayConfig, WatcherConfig, WebhookConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub admin: AdminConfig,
    pub wallet: WalletGatewayConfig,
    pub policy: PaymentPolicy,
    pub watcher: WatcherConfig,
    pub webhook: WebhookConfig,
}

impl LoadedConfig {
    /// Split off the reloadable parts behind `Arc<RwLock<T>>` wrappers.
    pub fn shared(&self) -> SharedConfig {
        SharedConfig {
            admin: Arc::new(RwLock::new(self.admin.clone())),
            policy: Arc::new(RwLock::new(self.policy.clone())),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = self.hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(self.build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        for (name, url) in [
            ("wallet.gateway_url", &config.wallet.gateway_url),
            ("wallet.daemon_url", &config.wallet.daemon_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be an http(s) url, got {url}"
                )));
            }
        }
        if config.admin.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin.secret must not be empty".into(),
            ));
        }
        if config.payments.max_ttl_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "payments.max_ttl_minutes must be positive".into(),
            ));
        }
        if config.payments.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "payments.poll_interval_secs must be positive".into(),
            ));
        }
        if config.webhook.timeout_millis == 0 || config.webhook.max_in_flight == 0 {
            return Err(ConfigError::ValidationError(
                "webhook.timeout_millis and webhook.max_in_flight must be positive".into(),
            ));
        }
        Ok(())
    }

    fn hash_secret(&self, plaintext: &str) -> Result<String, ConfigError> {
        use argon2::{
            Argon2, PasswordHasher,
            password_hash::{SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConfigError::HashError(e.to_string()))
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    fn build_loaded_config(&self, file_config: FileConfig, secret_hash: String) -> LoadedConfig {
        let FileConfig {
            server,
            wallet,
            payments,
            webhook,
            ..
        } = file_config;

        LoadedConfig {
            listen: server.listen,
            admin: AdminConfig::new(secret_hash),
            wallet: WalletGatewayConfig {
                gateway_url: wallet.gateway_url,
                daemon_url: wallet.daemon_url,
                network: wallet.network,
                request_timeout: Duration::from_millis(wallet.request_timeout_millis),
            },
            policy: PaymentPolicy {
                max_ttl: time::Duration::minutes(i64::from(payments.max_ttl_minutes)),
                min_confirmations: payments.min_confirmations,
            },
            watcher: WatcherConfig {
                poll_interval: Duration::from_secs(payments.poll_interval_secs),
            },
            webhook: WebhookConfig {
                timeout: Duration::from_millis(webhook.timeout_millis),
                max_in_flight: webhook.max_in_flight,
            },
        }
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "hunter2"

[wallet]
gateway_url = "http://127.0.0.1:40403"
daemon_url = "http://127.0.0.1:40402"
network = "testnet"

[payments]
max_ttl_minutes = 30
min_confirmations = 4
"#;

    fn temp_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "paywatch-{name}-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_hashes_plaintext_secret_and_rewrites_file() {
        let path = temp_config("hash", CONFIG);
        let loader = ConfigLoader::new(&path, None);

        let loaded = loader.load().unwrap();
        assert!(loaded.admin.verify_secret("hunter2"));
        assert!(!loaded.admin.verify_secret("hunter3"));
        assert_eq!(loaded.policy.max_ttl, time::Duration::minutes(30));
        assert_eq!(loaded.policy.min_confirmations, 4);
        assert_eq!(loaded.watcher.poll_interval, Duration::from_secs(60));
        assert_eq!(loaded.webhook.timeout, Duration::from_millis(1000));

        let rewritten: FileConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rewritten.is_admin_secret_hashed());

        // A second load keeps the stored hash.
        let reloaded = loader.reload().unwrap();
        assert!(reloaded.admin.verify_secret("hunter2"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_listen_override_and_validation() {
        let path = temp_config("override", CONFIG);
        let addr: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(addr)).load().unwrap();
        assert_eq!(loaded.listen, addr);
        std::fs::remove_file(&path).unwrap();

        let zero_poll = CONFIG.replace("min_confirmations = 4", "poll_interval_secs = 0");
        let path = temp_config("zero-poll", &zero_poll);
        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::ValidationError(_))
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
