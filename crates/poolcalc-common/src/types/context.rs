//! Decimal context - precision and rounding threaded through every operation
//!
//! There is no process-wide decimal configuration. Each calculation receives a
//! [`DecimalContext`] value and applies it when a result has to shed digits:
//! - `precision`: maximum significant digits kept in a result
//! - `rounding`: how the discarded digits are resolved

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Largest number of fractional digits the backing decimal can carry
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Rounding policy applied when a value is rescaled or trimmed to precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round to nearest, ties toward positive infinity
    HalfCeil,
    /// Round to nearest, ties away from zero
    HalfUp,
    /// Round to nearest, ties to the even neighbour
    HalfEven,
    /// Truncate toward zero
    Down,
    /// Toward negative infinity
    Floor,
    /// Toward positive infinity
    Ceil,
}

impl RoundingMode {
    /// Resolve the backend strategy for a value of the given sign.
    ///
    /// Half-ceil has no direct backend strategy: ties move up for positive
    /// values (away from zero) and toward zero for negative ones.
    pub fn strategy_for(&self, value: &Decimal) -> RoundingStrategy {
        match self {
            RoundingMode::HalfCeil => {
                if value.is_sign_negative() {
                    RoundingStrategy::MidpointTowardZero
                } else {
                    RoundingStrategy::MidpointAwayFromZero
                }
            }
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
            RoundingMode::Ceil => RoundingStrategy::ToPositiveInfinity,
        }
    }
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::HalfCeil
    }
}

/// Precision and rounding configuration for fixed-point arithmetic
///
/// The backing decimal holds at most 28 to 29 significant digits, so any
/// `precision` above that (including the default of 30) never trims a
/// value. Only lower precisions change results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalContext {
    /// Maximum significant digits retained in a result
    pub precision: u32,
    /// Rounding applied to discarded digits
    pub rounding: RoundingMode,
}

impl DecimalContext {
    /// Default working precision in significant digits
    pub const DEFAULT_PRECISION: u32 = 30;

    pub const fn new(precision: u32, rounding: RoundingMode) -> Self {
        Self {
            precision,
            rounding,
        }
    }

    /// Round `value` to at most `dp` fractional digits
    pub fn round_dp(&self, value: Decimal, dp: u32) -> Decimal {
        value.round_dp_with_strategy(dp, self.rounding.strategy_for(&value))
    }

    /// Trim `value` to the configured number of significant digits.
    ///
    /// A precision at or above what the backend holds leaves the value as is.
    pub fn apply_precision(&self, value: Decimal) -> Decimal {
        let value = value.normalize();
        let digits = significant_digits(&value);
        if self.precision == 0 || digits <= self.precision {
            return value;
        }

        let excess = digits - self.precision;
        if excess <= value.scale() {
            self.round_dp(value, value.scale() - excess)
        } else {
            value
                .round_sf_with_strategy(self.precision, self.rounding.strategy_for(&value))
                .unwrap_or(value)
        }
    }

    /// Apply precision, then round to the target scale
    pub fn finish(&self, value: Decimal, scale: u32) -> Decimal {
        self.round_dp(self.apply_precision(value), scale.min(MAX_DECIMAL_SCALE))
    }
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRECISION, RoundingMode::HalfCeil)
    }
}

/// Count of significant digits in the (normalized) mantissa
fn significant_digits(value: &Decimal) -> u32 {
    let mantissa = value.mantissa().unsigned_abs();
    if mantissa == 0 {
        1
    } else {
        mantissa.ilog10() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_half_ceil_ties() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.round_dp(dec!(2.5), 0), dec!(3));
        assert_eq!(ctx.round_dp(dec!(-2.5), 0), dec!(-2));
        assert_eq!(ctx.round_dp(dec!(2.4), 0), dec!(2));
        assert_eq!(ctx.round_dp(dec!(-2.6), 0), dec!(-3));
    }

    #[test]
    fn test_other_modes() {
        let half_even = DecimalContext::new(30, RoundingMode::HalfEven);
        assert_eq!(half_even.round_dp(dec!(2.5), 0), dec!(2));

        let down = DecimalContext::new(30, RoundingMode::Down);
        assert_eq!(down.round_dp(dec!(-2.9), 0), dec!(-2));

        let floor = DecimalContext::new(30, RoundingMode::Floor);
        assert_eq!(floor.round_dp(dec!(-2.1), 0), dec!(-3));

        let ceil = DecimalContext::new(30, RoundingMode::Ceil);
        assert_eq!(ceil.round_dp(dec!(2.1), 0), dec!(3));
    }

    #[test]
    fn test_precision_trims_fraction() {
        let ctx = DecimalContext::new(5, RoundingMode::HalfCeil);
        assert_eq!(ctx.apply_precision(dec!(123.456789)), dec!(123.46));
        assert_eq!(ctx.apply_precision(dec!(1.25)), dec!(1.25));
    }

    #[test]
    fn test_default_precision_is_noop_for_backend_values() {
        let ctx = DecimalContext::default();
        let value = dec!(1.000000001585489599188229325);
        assert_eq!(ctx.apply_precision(value), value);
    }

    #[test]
    fn test_finish_rounds_to_scale() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.finish(dec!(1.0000005), 6), dec!(1.000001));
    }
}
