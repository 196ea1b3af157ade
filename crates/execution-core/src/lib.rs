//! Core execution types.
//!
//! - **Order types**: `Order`, `OrderSide`, `OrderType`, `OrderStatus`
//! - **Trader**: the async capability every execution backend implements
//! - **Client order ids**: `generate_client_order_id`
//!
//! # Order Lifecycle
//!
//! 1. Engine decides to trade and calls `Trader::place_order`
//! 2. The backend returns an `Order` in `New` status (or an `ExecutionError`)
//! 3. A simulated backend later marks the order `Filled`; a live backend
//!    leaves status tracking to the exchange
//! 4. When the holding period ends, the engine calls `Trader::close_position`
//!    with the original side, which the backend inverts

mod correlation;
mod error;
mod order;
mod trader;

pub use correlation::generate_client_order_id;
pub use error::ExecutionError;
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use trader::Trader;
