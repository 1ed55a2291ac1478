//! HMAC signatures for paywatch webhooks and the store payment API.
//!
//! Both directions use the same scheme:
//!
//! ```text
//! X-Signature: {lowercase_hex(HMAC-SHA256(raw_json_body, key))}
//! ```
//!
//! Store secrets are distributed as hex strings; the decoded bytes are the
//! HMAC key. There is no timestamp in the signed data: a webhook is a one-shot
//! notification and carries no replay-sensitive command.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Paywatch-Admin-Authorization";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("secret key is not valid hex")]
    InvalidKey,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// An HMAC-SHA256 key decoded from a hex-encoded store secret.
#[derive(Clone)]
pub struct SigningKey {
    key: ring::hmac::Key,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl SigningKey {
    /// Build a key from raw secret bytes.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
        }
    }

    /// Build a key from a hex-encoded secret, as stored per store.
    pub fn from_hex(secret_hex: &str) -> Result<Self, SignatureError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::new(&secret))
    }

    /// Sign `message`, returning the raw MAC bytes.
    pub fn sign(&self, message: &[u8]) -> Box<[u8]> {
        ring::hmac::sign(&self.key, message)
            .as_ref()
            .to_owned()
            .into_boxed_slice()
    }

    /// Sign `message`, returning the lowercase hex header value.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message))
    }

    /// Verify a hex signature over `message` in constant time.
    pub fn verify_hex(&self, message: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
        let signature =
            hex::decode(signature_hex.trim()).map_err(|_| SignatureError::InvalidHex)?;
        ring::hmac::verify(&self.key, message, &signature)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SignedBody — typed payload with the exact bytes that were signed
// ---------------------------------------------------------------------------

/// A JSON body carrying its typed payload, the serialized bytes and their
/// HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBody<T> {
    pub body: T,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: serde::Serialize> SignedBody<T> {
    /// Serialize `body` and sign the resulting bytes with `key`.
    pub fn new(body: T, key: &SigningKey) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(&body)?;
        let signature = key.sign(json.as_bytes());
        Ok(Self {
            body,
            json,
            signature,
        })
    }

    /// The `X-Signature` header value.
    pub fn to_header(&self) -> String {
        hex::encode(&self.signature)
    }
}

impl<T: serde::de::DeserializeOwned> SignedBody<T> {
    /// Rebuild a [`SignedBody`] from a raw `X-Signature` header value and
    /// the JSON body string.
    ///
    /// This decodes the header and deserializes the body but does **not**
    /// verify the HMAC. Call [`verify`](Self::verify) for that.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let signature = hex::decode(header_value.trim())
            .map_err(|_| SignatureError::InvalidHex)?
            .into_boxed_slice();
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            json: body_json,
            signature,
        })
    }

    /// Verify the HMAC, consuming `self` and returning the authenticated payload.
    pub fn verify(self, key: &SigningKey) -> Result<T, SignatureError> {
        ring::hmac::verify(&key.key, self.json.as_bytes(), &self.signature)?;
        Ok(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{PaymentStatus, PaymentUpdateEvent};

    // RFC 4231 test case 2.
    #[test]
    fn test_hmac_sha256_known_vector() {
        let key = SigningKey::new(b"Jefe");
        assert_eq!(
            key.sign_hex(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hex_secret_is_decoded_before_keying() {
        let from_hex = SigningKey::from_hex("4a656665").unwrap();
        let raw = SigningKey::new(b"Jefe");
        assert_eq!(from_hex.sign_hex(b"msg"), raw.sign_hex(b"msg"));
        assert!(matches!(
            SigningKey::from_hex("not-hex"),
            Err(SignatureError::InvalidKey)
        ));
    }

    #[test]
    fn test_signed_body_verifies_and_rejects_tampering() {
        let key = SigningKey::from_hex("00112233445566778899aabbccddeeff").unwrap();
        let signed =
            SignedBody::new(PaymentUpdateEvent::new("abcd", PaymentStatus::Paid), &key).unwrap();
        let header = signed.to_header();

        let received =
            SignedBody::<PaymentUpdateEvent>::from_header_and_body(&header, signed.json.clone())
                .unwrap();
        assert_eq!(received.verify(&key).unwrap().status, PaymentStatus::Paid);

        let tampered = signed.json.replace("paid", "error");
        let received =
            SignedBody::<PaymentUpdateEvent>::from_header_and_body(&header, tampered).unwrap();
        assert!(matches!(
            received.verify(&key),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_verify_hex_wrong_key() {
        let key = SigningKey::new(b"a");
        let other = SigningKey::new(b"b");
        let sig = key.sign_hex(b"body");
        assert!(key.verify_hex(b"body", &sig).is_ok());
        assert!(other.verify_hex(b"body", &sig).is_err());
        assert!(matches!(
            key.verify_hex(b"body", "zz"),
            Err(SignatureError::InvalidHex)
        ));
    }
}
