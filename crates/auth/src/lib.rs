//! Authentication and signing for the WEEX contract API.
//!
//! # Features
//!
//! - **Secure Credentials**: the API secret and passphrase are wrapped in
//!   `SecretString` to prevent accidental logging and ensure memory is zeroed
//!   on drop.
//! - **HMAC-SHA256 Signing**: `base64(HMAC-SHA256(secret, ts + METHOD + path
//!   [+ "?" + query] [+ body]))`, sent as `ACCESS-SIGN`.
//! - **Environment Loading**: credentials can be loaded from environment
//!   variables or a `.env` file.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::{ApiCredentials, RequestSigner};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let signer = RequestSigner::new(&credentials);
//!
//! let signature = signer.sign_request(&ts, "GET", "/capi/v2/account/accounts", None, None);
//! ```

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::RequestSigner;
