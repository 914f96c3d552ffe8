//! Interest rates - per-second compounding factors and their APR
//!
//! On-chain rates are stored as a per-second factor at [`RATIO_SCALE`]:
//! `rate = 1 + APR / SECONDS_PER_YEAR`.

use rust_decimal::Decimal;

use super::context::DecimalContext;
use super::fixed_point::{FixedPoint, RATIO_SCALE};
use crate::error::ArithmeticError;

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: u32 = 365 * 24 * 60 * 60;

/// Per-second factor for an annual percentage rate given as a fraction
pub fn rate_per_second_from_apr(
    apr: &FixedPoint,
    ctx: &DecimalContext,
) -> Result<FixedPoint, ArithmeticError> {
    let per_second = apr.value() / Decimal::from(SECONDS_PER_YEAR);
    let rate = Decimal::ONE
        .checked_add(per_second)
        .ok_or(ArithmeticError::Overflow)?;
    Ok(FixedPoint::ratio(rate, ctx))
}

/// Annual rate, as a fraction, of a per-second factor.
///
/// A zero factor (an unset field) reads as no interest.
pub fn apr_from_rate_per_second(
    rate: &FixedPoint,
    ctx: &DecimalContext,
) -> Result<FixedPoint, ArithmeticError> {
    if rate.is_zero() {
        return Ok(FixedPoint::zero(RATIO_SCALE));
    }
    let apr = rate
        .value()
        .checked_sub(Decimal::ONE)
        .and_then(|excess| excess.checked_mul(Decimal::from(SECONDS_PER_YEAR)))
        .ok_or(ArithmeticError::Overflow)?;
    Ok(FixedPoint::ratio(apr, ctx))
}
