//! WEEX contract REST API client.
//!
//! This crate provides a typed client for the WEEX perpetual-contract REST API
//! with:
//!
//! - **Admission control**: every call clears a shared [`rate_limit::RateLimiter`]
//!   for its endpoint's scope and weight before it is sent
//! - **Signing**: private calls carry `ACCESS-KEY`, `ACCESS-SIGN`,
//!   `ACCESS-TIMESTAMP` and `ACCESS-PASSPHRASE` headers
//! - **Time synchronization**: a one-off drift measurement corrects signed
//!   timestamps
//! - **Typed responses**: string-encoded numerics parsed on demand
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::ApiCredentials;
//! use rate_limit::RateLimiter;
//! use weex_rest::WeexRestClient;
//!
//! let limiter = Arc::new(RateLimiter::default());
//! let client = WeexRestClient::new(ApiCredentials::from_env()?, WeexEnvironment::from_env(), limiter)?;
//!
//! client.sync_time().await?;
//! let ticker = client.get_ticker("cmt_btcusdt").await?;
//! ```

mod client;
pub mod endpoints;
mod error;
mod responses;

pub use client::{encode_query, SignedHeaders, WeexRestClient};
pub use endpoints::Endpoint;
pub use error::WeexRestError;
pub use responses::{
    parse_decimal, AccountPosition, AccountsResponse, CollateralEntry, Contract, DepthResponse,
    FundRate, IndexResponse, LeverageSetting, PlaceOrderRequest, PlaceOrderResponse,
    ServerTimeResponse, Ticker, USDT_COIN_ID,
};
