//! WEEX REST API error types.

use rest_client::RestError;
use thiserror::Error;

/// Errors that can occur when interacting with the WEEX REST API.
#[derive(Debug, Error)]
pub enum WeexRestError {
    /// Transport, status or decode failure from the REST layer.
    #[error("REST client error: {0}")]
    Rest(#[from] RestError),

    /// A request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// An endpoint costs more than its rate-limit bucket can ever admit.
    #[error("endpoint {path} weight {weight} exceeds rate-limit capacity {capacity}")]
    WeightExceedsCapacity {
        path: &'static str,
        weight: u32,
        capacity: u32,
    },
}

impl WeexRestError {
    /// Transport failure reaching the exchange.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_network())
    }

    /// Non-200 response.
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_status())
    }

    /// Response body did not match the expected schema.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_decode())
    }
}
