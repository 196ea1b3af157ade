//! Basis trading engine for WEEX perpetual contracts.
//!
//! Every tick the engine reads a [`model::MarketSnapshot`] per symbol,
//! scores the mark/index deviation against its recent history and places a
//! limit order when the dislocation is large enough and funding pays for
//! holding the trade. Positions are closed at market once their holding
//! period ends and their net PnL is booked.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  snapshot  ┌──────────────────┐  place / close  ┌──────────────┐
//! │  MarketData  │──────────> │      Engine      │───────────────> │    Trader    │
//! │  (WEEX REST) │            │ - SymbolStates   │                 │ paper | live │
//! └──────────────┘            │ - signal gates   │                 └──────────────┘
//!                             │ - PositionBook   │
//!                             └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strategy_runner::{Engine, EngineConfig, PaperTrader};
//!
//! let config = EngineConfig::from_env()?;
//! let trader = Arc::new(PaperTrader::new(config.paper_fill_delay));
//! let mut engine = Engine::new(config, market, trader, metrics::create_metrics());
//! engine.run(shutdown_rx).await;
//! ```

pub mod config;
mod engine;
mod error;
mod instruments;
mod live_trader;
mod market_data;
mod paper_trader;
mod position;
pub mod signal;
mod sizing;
mod symbol_state;

pub use config::{CloseFailurePolicy, ConfigError, EngineConfig, TraderMode};
pub use engine::{Engine, TradeOutcome};
pub use error::{EngineError, SkipReason};
pub use instruments::{fee_rate, InstrumentCache, DEFAULT_MAKER_FEE_RATE, DEFAULT_TAKER_FEE_RATE};
pub use live_trader::{build_order_request, LiveTrader};
pub use market_data::{MarketData, DEPTH_LIMIT};
pub use paper_trader::PaperTrader;
pub use position::{settle, Position, PositionBook, Settlement, SymbolPnl};
pub use signal::{basis_deviation, TradeDecision};
pub use sizing::{quantize_size, FALLBACK_SIZE_INCREMENT};
pub use symbol_state::{Ring, SymbolState, SymbolStates, SAMPLE_CAPACITY};
