//! Generic REST client infrastructure.
//!
//! This crate provides a thin wrapper around `reqwest` with:
//!
//! - Consistent error handling via `RestError` (network / status / decode)
//! - GET and POST with an optional raw JSON body, sent byte-for-byte
//! - JSON response deserialization
//! - Header injection for authentication
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_client::{Method, RestClient};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct TimeResponse {
//!     timestamp: i64,
//! }
//!
//! let client = RestClient::with_default_timeout("https://api-contract.weex.com")?;
//! let time: TimeResponse = client
//!     .send(Method::GET, "/capi/v2/market/time", None, None, None)
//!     .await?;
//! ```

mod client;
mod error;

pub use client::RestClient;
pub use error::RestError;
pub use reqwest::Method;
