use std::env;

/// Default lifetime of an admin form nonce: 24 hours.
pub const DEFAULT_NONCE_MAX_AGE_SECONDS: u64 = 86400;

#[derive(Debug, Clone)]
pub struct NonceConfig {
    /// HMAC key used to sign and verify form nonces
    pub secret: String,
    pub max_age_seconds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum NonceConfigError {
    #[error(
        "XSF_NONCE_SECRET environment variable is required to sign admin form nonces. \
         Generate a secret with: openssl rand -base64 32"
    )]
    MissingSecret,
}

/// Reads the nonce configuration from XSF_NONCE_SECRET and XSF_NONCE_MAX_AGE_SECONDS.
/// An empty secret counts as missing. A max age that is not a number falls back to the default.
pub fn get_nonce_config() -> Result<NonceConfig, NonceConfigError> {
    let secret = env::var("XSF_NONCE_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(NonceConfigError::MissingSecret)?;

    let max_age_seconds = env::var("XSF_NONCE_MAX_AGE_SECONDS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_NONCE_MAX_AGE_SECONDS);

    Ok(NonceConfig { secret, max_age_seconds })
}
