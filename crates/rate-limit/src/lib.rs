//! Sliding-window admission control for exchange API weight.
//!
//! Each endpoint declares a [`CredentialScope`] and a weight. Before a call
//! goes out, [`RateLimiter::acquire`] waits until admitting that weight keeps
//! the scope's trailing-window total within capacity.
//!
//! Address-scoped (market data) and account-scoped (balances, orders) traffic
//! use separate buckets, so heavy account polling cannot starve market data.
//!
//! # Example
//!
//! ```rust,ignore
//! use rate_limit::{CredentialScope, RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::default());
//! limiter.acquire(CredentialScope::Address, 1).await;
//! ```

mod limiter;

pub use limiter::{CredentialScope, RateBucket, RateLimitConfig, RateLimiter};
