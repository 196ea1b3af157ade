//! Execution backend errors.

use thiserror::Error;

/// A [`Trader`](crate::Trader) backend failed to place or close an order.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The request was malformed before it reached the backend.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// The backend or exchange refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("execution backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExecutionError::Rejected("insufficient margin".into());
        assert_eq!(err.to_string(), "order rejected: insufficient margin");
    }
}
