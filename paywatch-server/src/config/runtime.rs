//! Runtime configuration held by the running server.
//!
//! Only the sections that a SIGHUP reload can change live behind locks; the
//! listen address and the wallet endpoints are read once at startup.

use paywatch_core::config::SharedPolicy;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Admin authentication settings.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Check a plaintext secret against the stored argon2 hash.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};

        let Ok(parsed) = PasswordHash::new(&self.secret_hash) else {
            tracing::error!("Stored admin secret hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Reloadable configuration shared between handlers, poll loops and the
/// SIGHUP handler.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Read by every poll tick and by payment read-back.
    pub policy: SharedPolicy,
}
