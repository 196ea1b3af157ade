//! Order size quantization.

use rust_decimal::{Decimal, RoundingStrategy};

/// Increment used when an instrument's step size is unknown.
pub const FALLBACK_SIZE_INCREMENT: Decimal = Decimal::ONE;

/// Snap `suggested` to a multiple of `increment`.
///
/// Rounds to the nearest increment (halves away from zero) with a floor of
/// one increment. If `min_size` is set and the result is below it, rounds up
/// to the first multiple of `increment` at or above `min_size`.
pub fn quantize_size(suggested: Decimal, increment: Decimal, min_size: Option<Decimal>) -> Decimal {
    let increment = if increment > Decimal::ZERO {
        increment
    } else {
        FALLBACK_SIZE_INCREMENT
    };

    let units = (suggested / increment)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ONE);
    let size = units * increment;

    match min_size {
        Some(min) if min > Decimal::ZERO && size < min => (min / increment).ceil() * increment,
        _ => size,
    }
    .normalize()
}
