//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `StoreSignedBody<T>` — verifies the `X-Signature` header against the raw
//!   JSON body with the secret key of the store named in the path.
//! - `AdminAuth` — checks the `Paywatch-Admin-Authorization` header against
//!   the argon2 hash of the admin secret.
//!
//! All HMAC operations are delegated to [`paywatch_sdk::signature`].

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use paywatch_core::store::StoreError;
use paywatch_sdk::signature::{
    ADMIN_AUTH_HEADER, SIGNATURE_HEADER, SignatureError, SignedBody, SigningKey,
};
use serde::de::DeserializeOwned;

use crate::state::AppState;

/// Largest request body accepted for signature verification.
const MAX_BODY_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// StoreSignedBody — store API authentication via signed JSON body
// ---------------------------------------------------------------------------

/// An Axum extractor that verifies the `X-Signature` header and
/// deserializes + authenticates the JSON request body.
///
/// The route must carry the store id as its only path parameter; the
/// store's hex secret key is looked up in the payment store.
///
/// # Header format
///
/// ```text
/// X-Signature: {lowercase_hex(HMAC-SHA256(json_body, hex_decode(store_secret_key)))}
/// ```
pub struct StoreSignedBody<T> {
    pub store_id: i32,
    pub body: T,
}

/// Errors that can occur during signed-body verification.
#[derive(Debug, thiserror::Error)]
pub enum SignedBodyError {
    #[error("missing X-Signature header")]
    MissingHeader,
    #[error("invalid X-Signature header format")]
    InvalidHeader,
    #[error("invalid store id")]
    InvalidStoreId,
    #[error("unknown store")]
    UnknownStore,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SignatureError> for SignedBodyError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidHex => Self::InvalidHeader,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch | SignatureError::InvalidKey => {
                Self::VerificationFailed
            }
        }
    }
}

impl IntoResponse for SignedBodyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SignedBodyError::MissingHeader => (StatusCode::UNAUTHORIZED, "missing X-Signature header"),
            SignedBodyError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid X-Signature header format")
            }
            SignedBodyError::InvalidStoreId => (StatusCode::BAD_REQUEST, "invalid store id"),
            SignedBodyError::UnknownStore => (StatusCode::NOT_FOUND, "store not found"),
            SignedBodyError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            SignedBodyError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
            SignedBodyError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
            SignedBodyError::Store(e) => {
                tracing::error!(error = %e, "Failed to look up store secret key");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (status, message).into_response()
    }
}

impl<T: DeserializeOwned + Send> FromRequest<AppState> for StoreSignedBody<T> {
    type Rejection = SignedBodyError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let header_value = parts
            .headers
            .get(SIGNATURE_HEADER)
            .ok_or(SignedBodyError::MissingHeader)?
            .to_str()
            .map_err(|_| SignedBodyError::InvalidHeader)?
            .to_owned();

        let Path(store_id) = Path::<i32>::from_request_parts(&mut parts, state)
            .await
            .map_err(|_| SignedBodyError::InvalidStoreId)?;

        let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| SignedBodyError::BodyReadError)?;

        let json =
            String::from_utf8(body_bytes.to_vec()).map_err(|_| SignedBodyError::BodyReadError)?;

        let signed = SignedBody::<T>::from_header_and_body(&header_value, json)?;

        let secret_hex = state
            .store()
            .secret_key(store_id)
            .await?
            .ok_or(SignedBodyError::UnknownStore)?;
        let key = SigningKey::from_hex(&secret_hex).map_err(|_| {
            tracing::error!(store_id, "Store secret key is not valid hex");
            SignedBodyError::VerificationFailed
        })?;

        let body = signed.verify(&key)?;
        Ok(StoreSignedBody { store_id, body })
    }
}

// ---------------------------------------------------------------------------
// AdminAuth — admin API authentication
// ---------------------------------------------------------------------------

/// An Axum extractor that admits requests carrying the plaintext admin
/// secret in the `Paywatch-Admin-Authorization` header.
pub struct AdminAuth;

#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AdminAuthError::MissingHeader => "missing Paywatch-Admin-Authorization header",
            AdminAuthError::InvalidSecret => "invalid admin secret",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidSecret)?;

        let admin = state.config.admin.read().await;
        if !admin.verify_secret(secret) {
            drop(admin);
            tracing::warn!("Rejected admin request with invalid secret");
            return Err(AdminAuthError::InvalidSecret);
        }
        drop(admin);
        Ok(AdminAuth)
    }
}
