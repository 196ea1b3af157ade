//! Engine error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the engine from starting or running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Exchange REST failure.
    #[error("REST API error: {0}")]
    RestApi(#[from] weex_rest::WeexRestError),

    /// Order execution failure.
    #[error("execution error: {0}")]
    Execution(#[from] execution_core::ExecutionError),

    /// Live trading was requested without API credentials.
    #[error("live trading requires WEEX_API_KEY, WEEX_API_SECRET and WEEX_API_PASSPHRASE")]
    MissingCredentials,

    #[error("log directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a tick's trade evaluation declined to act.
///
/// Not a failure: every tick that does not trigger ends with one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    /// Mark, index or last price is zero.
    #[error("missing mark/index/last price")]
    InvalidPrices,

    #[error("|z| {z:.3} below threshold {threshold}")]
    BelowThreshold { z: f64, threshold: f64 },

    #[error("cooldown active, {remaining_ms}ms remaining")]
    Cooldown { remaining_ms: u64 },

    #[error("funding rate {rate} exceeds {max}")]
    FundingTooHigh { rate: Decimal, max: Decimal },

    #[error("spread ratio {ratio} exceeds {max}")]
    SpreadTooWide { ratio: Decimal, max: Decimal },

    /// The trade would pay funding rather than collect it.
    #[error("deviation {deviation:.6} against funding rate {rate}")]
    CarryMisaligned { deviation: f64, rate: Decimal },

    #[error("notional {notional} exceeds {max}")]
    NotionalTooLarge { notional: Decimal, max: Decimal },
}

impl SkipReason {
    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidPrices => "invalid_prices",
            Self::BelowThreshold { .. } => "below_threshold",
            Self::Cooldown { .. } => "cooldown",
            Self::FundingTooHigh { .. } => "funding_too_high",
            Self::SpreadTooWide { .. } => "spread_too_wide",
            Self::CarryMisaligned { .. } => "carry_misaligned",
            Self::NotionalTooLarge { .. } => "notional_too_large",
        }
    }
}
