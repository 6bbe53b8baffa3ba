use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::nonce_config::NonceConfig;

type HmacSha256 = Hmac<Sha256>;

/// Action the admin settings form nonce is bound to.
pub const SAVE_ACTION: &str = "wp_xsf_save";

/// Form field carrying the nonce.
pub const NONCE_FIELD: &str = "wp_xsf_nonce";

/// Clock skew tolerated for nonces stamped slightly in the future.
const MAX_FUTURE_SKEW_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    #[error("Invalid nonce format")]
    InvalidFormat,

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Checks that a submitted form token was issued for an action.
pub trait NonceVerifier: Send + Sync {
    fn verify(&self, token: &str, action: &str) -> bool;
}

/// Generate a nonce with format: timestamp:nonce:signature
/// The signature is HMAC-SHA256(action:timestamp:nonce, secret), so a nonce only verifies for its action.
pub fn generate_nonce(action: &str, secret: &str) -> Result<String, NonceError> {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let nonce: [u8; 16] = rand::random();
    let nonce_b64 = general_purpose::URL_SAFE_NO_PAD.encode(nonce);

    let payload = format!("{}:{}", timestamp, nonce_b64);
    let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac_for(action, &payload, secret)?.finalize().into_bytes());

    Ok(format!("{}:{}", payload, signature))
}

/// Validate a nonce for an action.
/// Returns Ok(true) if the signature matches and the nonce is not expired, Ok(false) otherwise.
/// Tokens that are not even shaped like a nonce are an error.
pub fn verify_nonce(token: &str, action: &str, secret: &str, max_age_secs: u64) -> Result<bool, NonceError> {
    let parts: Vec<&str> = token.split(':').collect();
    let [timestamp_str, nonce, provided_signature] = parts.as_slice() else {
        return Err(NonceError::InvalidFormat);
    };

    let timestamp: u64 = timestamp_str.parse().map_err(|_| NonceError::InvalidFormat)?;
    let current_time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    if current_time.saturating_sub(timestamp) > max_age_secs {
        return Ok(false);
    }
    if timestamp > current_time + MAX_FUTURE_SKEW_SECS {
        return Ok(false);
    }

    let provided = general_purpose::URL_SAFE_NO_PAD.decode(provided_signature)?;
    let payload = format!("{}:{}", timestamp_str, nonce);

    // Constant-time comparison
    Ok(mac_for(action, &payload, secret)?.verify_slice(&provided).is_ok())
}

fn mac_for(action: &str, payload: &str, secret: &str) -> Result<HmacSha256, NonceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| NonceError::HmacError(e.to_string()))?;
    mac.update(action.as_bytes());
    mac.update(b":");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// HMAC-signed nonces issued and checked with a shared secret.
#[derive(Debug, Clone)]
pub struct HmacNonces {
    secret: String,
    max_age_seconds: u64,
}

impl HmacNonces {
    pub fn new(secret: impl Into<String>, max_age_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            max_age_seconds,
        }
    }

    pub fn from_config(config: &NonceConfig) -> Self {
        Self::new(config.secret.clone(), config.max_age_seconds)
    }

    /// A fresh nonce for the action, to embed in the admin form.
    pub fn issue(&self, action: &str) -> Result<String, NonceError> {
        generate_nonce(action, &self.secret)
    }
}

impl NonceVerifier for HmacNonces {
    fn verify(&self, token: &str, action: &str) -> bool {
        match verify_nonce(token, action, &self.secret, self.max_age_seconds) {
            Ok(valid) => valid,
            Err(error) => {
                tracing::debug!("Rejecting malformed nonce: {}", error);
                false
            }
        }
    }
}
