//! Bearer-token verification.
//!
//! Tokens are `base64url(identity|expiry_unix) . base64url(hmac_sha256)`.
//! The server only sees the [`AuthVerifier`] trait, so the scheme can be
//! swapped for an external identity provider without touching handlers.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use mailpilot_types::secret::SecretString;

use crate::error::{CoreError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Resolves a bearer credential to an identity.
pub trait AuthVerifier: Send + Sync {
    /// Verify signature and expiry; return the identity the credential
    /// was issued for.
    fn verify(&self, credential: &str) -> Result<String>;
}

/// HMAC-SHA256 token verifier and minting helper.
pub struct HmacAuthVerifier {
    key: Vec<u8>,
}

impl HmacAuthVerifier {
    /// Build a verifier over the configured signing secret.
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: secret.expose().as_bytes().to_vec(),
        }
    }

    /// Mint a token for `identity`, valid for `ttl`.
    pub fn mint(&self, identity: &str, ttl: Duration) -> String {
        let expiry = (Utc::now() + ttl).timestamp();
        let payload = format!("{identity}|{expiry}");
        let sig = self.sign(payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(sig)
        )
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl AuthVerifier for HmacAuthVerifier {
    fn verify(&self, credential: &str) -> Result<String> {
        let (payload_b64, sig_b64) = credential
            .split_once('.')
            .ok_or_else(|| CoreError::Unauthenticated("malformed token".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| CoreError::Unauthenticated("malformed token".into()))?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| CoreError::Unauthenticated("malformed token".into()))?;

        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(&payload);
        mac.verify_slice(&sig)
            .map_err(|_| CoreError::Unauthenticated("bad signature".into()))?;

        let payload = String::from_utf8(payload)
            .map_err(|_| CoreError::Unauthenticated("malformed token".into()))?;
        let (identity, expiry) = payload
            .rsplit_once('|')
            .ok_or_else(|| CoreError::Unauthenticated("malformed token".into()))?;
        let expiry: i64 = expiry
            .parse()
            .map_err(|_| CoreError::Unauthenticated("malformed token".into()))?;

        if expiry <= Utc::now().timestamp() {
            return Err(CoreError::Unauthenticated("token expired".into()));
        }

        Ok(identity.to_owned())
    }
}
