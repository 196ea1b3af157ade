//! Secure API credential management.
//!
//! Uses the `secrecy` crate to prevent accidental logging of the secret key
//! and passphrase, and ensures memory is zeroed on drop.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

/// API credentials for authenticated requests.
///
/// WEEX private calls need three values: the public access key, the secret
/// used as HMAC key, and the account passphrase. The last two are wrapped in
/// `SecretString`.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
    passphrase: SecretString,
}

impl ApiCredentials {
    /// Load credentials from environment variables.
    ///
    /// Looks for:
    /// - `WEEX_API_KEY` - The access key (public)
    /// - `WEEX_API_SECRET` - The secret key (private)
    /// - `WEEX_API_PASSPHRASE` - The account passphrase (private)
    ///
    /// # Errors
    /// Returns `AuthError::MissingEnvVar` if any variable is not set.
    pub fn from_env() -> Result<Self, AuthError> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        let api_key = read_var("WEEX_API_KEY")?;
        let secret_key = read_var("WEEX_API_SECRET")?;
        let passphrase = read_var("WEEX_API_PASSPHRASE")?;

        Ok(Self::new(api_key, secret_key, passphrase))
    }

    /// Create credentials from explicit values.
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
            passphrase: SecretString::from(passphrase),
        }
    }

    /// Credentials with every field empty.
    ///
    /// Enough for public market data; private calls will be rejected by the
    /// exchange.
    pub fn anonymous() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }

    /// Get the API key (public, safe to log).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Whether an access key is configured at all.
    pub fn is_anonymous(&self) -> bool {
        self.api_key.is_empty()
    }

    /// Expose the secret key for signing.
    ///
    /// **WARNING**: Only use this for cryptographic operations.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }

    /// Expose the passphrase for the `ACCESS-PASSPHRASE` header.
    pub fn expose_passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }
}

fn read_var(name: &str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::MissingEnvVar(name.into()))
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}
