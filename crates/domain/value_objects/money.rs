use anyhow::{Result, anyhow};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Converts a decimal price (e.g. euros) into the processor's integer minor units (cents),
/// rounding half away from zero.
pub fn to_minor_units(price: Decimal) -> Result<i64> {
    if price.is_sign_negative() {
        return Err(anyhow!("price must not be negative: {price}"));
    }

    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| anyhow!("price does not fit into minor units: {price}"))
}
