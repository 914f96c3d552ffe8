//! FixedPoint - scale-aware decimal values
//!
//! Every amount the engine touches is a [`FixedPoint`]: a decimal value paired
//! with the number of fractional digits its domain carries on-chain.
//! - Currency amounts: `10^decimals` of the pool currency (usually 18)
//! - Ratios and per-second rates: 10^27
//! - Percentages: 10^25 (a 27-digit ratio read in percent)
//! - Oracle prices and quantities: 10^27
//!
//! Results that would carry more digits than their scale are rounded with the
//! caller's [`DecimalContext`].

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::context::{DecimalContext, MAX_DECIMAL_SCALE};
use crate::error::ArithmeticError;

/// Default pool currency scale
pub const CURRENCY_SCALE: u32 = 18;

/// Fractions (advance rate, percent of NAV) and per-second interest rates
pub const RATIO_SCALE: u32 = 27;

/// A ratio expressed in percent: raw units of 10^25 equal one percent
pub const PERCENT_SCALE: u32 = 25;

/// Oracle price per unit of an external asset
pub const ORACLE_PRICE_SCALE: u32 = 27;

/// Quantity of an external asset
pub const QUANTITY_SCALE: u32 = 27;

/// `10^scale` as a decimal, `None` past the backend limit
pub fn scale_factor(scale: u32) -> Option<Decimal> {
    if scale > MAX_DECIMAL_SCALE {
        return None;
    }
    10i128
        .checked_pow(scale)
        .and_then(|factor| Decimal::try_from_i128_with_scale(factor, 0).ok())
}

/// Exact decimal held at a domain scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "FixedPointRepr")]
pub struct FixedPoint {
    value: Decimal,
    scale: u32,
}

/// Wire form of a [`FixedPoint`], checked before it becomes one
#[derive(Deserialize)]
struct FixedPointRepr {
    value: Decimal,
    scale: u32,
}

impl TryFrom<FixedPointRepr> for FixedPoint {
    type Error = ArithmeticError;

    /// Snapshots must already sit at their scale; nothing is rounded here.
    fn try_from(repr: FixedPointRepr) -> Result<Self, Self::Error> {
        if repr.scale > MAX_DECIMAL_SCALE {
            return Err(ArithmeticError::ScaleOutOfRange {
                scale: repr.scale,
                max: MAX_DECIMAL_SCALE,
            });
        }

        let value = repr.value.normalize();
        if value.scale() > repr.scale {
            return Err(ArithmeticError::ExcessPrecision {
                actual: value.scale(),
                scale: repr.scale,
            });
        }

        Ok(Self {
            value,
            scale: repr.scale,
        })
    }
}

impl FixedPoint {
    /// Create a value at `scale`, rounding excess digits with `ctx`.
    ///
    /// Scales beyond the backend limit are clamped to it.
    pub fn new(value: Decimal, scale: u32, ctx: &DecimalContext) -> Self {
        let scale = scale.min(MAX_DECIMAL_SCALE);
        Self {
            value: ctx.finish(value, scale),
            scale,
        }
    }

    pub fn zero(scale: u32) -> Self {
        Self {
            value: Decimal::ZERO,
            scale: scale.min(MAX_DECIMAL_SCALE),
        }
    }

    /// Currency amount at the given pool decimals
    pub fn currency(value: Decimal, decimals: u32, ctx: &DecimalContext) -> Self {
        Self::new(value, decimals, ctx)
    }

    /// Fraction or per-second rate at [`RATIO_SCALE`]
    pub fn ratio(value: Decimal, ctx: &DecimalContext) -> Self {
        Self::new(value, RATIO_SCALE, ctx)
    }

    /// Oracle price at [`ORACLE_PRICE_SCALE`]
    pub fn price(value: Decimal, ctx: &DecimalContext) -> Self {
        Self::new(value, ORACLE_PRICE_SCALE, ctx)
    }

    /// Asset quantity at [`QUANTITY_SCALE`]
    pub fn quantity(value: Decimal, ctx: &DecimalContext) -> Self {
        Self::new(value, QUANTITY_SCALE, ctx)
    }

    /// Build from an on-chain integer expressed in units of `10^-scale`
    pub fn from_raw(raw: i128, scale: u32) -> Result<Self, ArithmeticError> {
        if scale > MAX_DECIMAL_SCALE {
            return Err(ArithmeticError::NotRepresentable { raw, scale });
        }

        // Trailing zeros are exact and free up mantissa room
        let mut mantissa = raw;
        let mut digits = scale;
        while digits > 0 && mantissa != 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            digits -= 1;
        }

        let value = Decimal::try_from_i128_with_scale(mantissa, digits)
            .map_err(|_| ArithmeticError::NotRepresentable { raw, scale })?;
        Ok(Self { value, scale })
    }

    /// On-chain integer in units of `10^-scale`
    pub fn to_raw(&self) -> Result<i128, ArithmeticError> {
        let current = self.value.scale();
        if current > self.scale {
            return Err(ArithmeticError::ExcessPrecision {
                actual: current,
                scale: self.scale,
            });
        }

        let factor = 10i128
            .checked_pow(self.scale - current)
            .ok_or(ArithmeticError::Overflow)?;
        self.value
            .mantissa()
            .checked_mul(factor)
            .ok_or(ArithmeticError::Overflow)
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.value
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.value < Decimal::ZERO
    }

    /// Same value at another scale
    pub fn rescale(&self, scale: u32, ctx: &DecimalContext) -> Self {
        Self::new(self.value, scale, ctx)
    }

    /// Sum at the wider of the two scales
    pub fn add(&self, other: &Self, ctx: &DecimalContext) -> Result<Self, ArithmeticError> {
        let sum = self
            .value
            .checked_add(other.value)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self::new(sum, self.scale.max(other.scale), ctx))
    }

    /// Difference at the wider of the two scales
    pub fn sub(&self, other: &Self, ctx: &DecimalContext) -> Result<Self, ArithmeticError> {
        let difference = self
            .value
            .checked_sub(other.value)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self::new(difference, self.scale.max(other.scale), ctx))
    }

    /// Product rescaled to `scale`.
    ///
    /// The exact product carries `s1 + s2` fractional digits; the extra
    /// digits are rounded away with `ctx`. Products past the backend range
    /// (about 7.9e28) fail with [`ArithmeticError::Overflow`].
    pub fn mul(
        &self,
        other: &Self,
        scale: u32,
        ctx: &DecimalContext,
    ) -> Result<Self, ArithmeticError> {
        let product = self
            .value
            .checked_mul(other.value)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self::new(product, scale, ctx))
    }

    /// Quotient rescaled to `scale`
    pub fn div(
        &self,
        other: &Self,
        scale: u32,
        ctx: &DecimalContext,
    ) -> Result<Self, ArithmeticError> {
        if other.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let quotient = self
            .value
            .checked_div(other.value)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self::new(quotient, scale, ctx))
    }

    pub fn abs(&self) -> Self {
        Self {
            value: self.value.abs(),
            scale: self.scale,
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            value: -self.value,
            scale: self.scale,
        }
    }

    /// Negative values become zero
    pub fn clamp_non_negative(&self) -> Self {
        if self.is_negative() {
            Self::zero(self.scale)
        } else {
            *self
        }
    }
}

/// Ratio at [`RATIO_SCALE`] from a percentage value (5 -> 0.05)
pub fn ratio_from_percent(percent: &FixedPoint, ctx: &DecimalContext) -> FixedPoint {
    FixedPoint::new(percent.value() / Decimal::ONE_HUNDRED, RATIO_SCALE, ctx)
}

/// Percentage at [`PERCENT_SCALE`] from a ratio (0.05 -> 5)
pub fn percent_from_ratio(
    ratio: &FixedPoint,
    ctx: &DecimalContext,
) -> Result<FixedPoint, ArithmeticError> {
    let percent = ratio
        .value()
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(ArithmeticError::Overflow)?;
    Ok(FixedPoint::new(percent, PERCENT_SCALE, ctx))
}

impl PartialEq for FixedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for FixedPoint {}

impl PartialOrd for FixedPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> DecimalContext {
        DecimalContext::default()
    }

    #[test]
    fn test_new_rounds_to_scale() {
        let value = FixedPoint::currency(dec!(1.23456), 2, &ctx());
        assert_eq!(value.value(), dec!(1.23));

        let tie = FixedPoint::currency(dec!(1.005), 2, &ctx());
        assert_eq!(tie.value(), dec!(1.01));

        let negative_tie = FixedPoint::currency(dec!(-1.005), 2, &ctx());
        assert_eq!(negative_tie.value(), dec!(-1.00));
    }

    #[test]
    fn test_raw_conversion() {
        let amount = FixedPoint::from_raw(1_500_000_000_000_000_000, CURRENCY_SCALE).unwrap();
        assert_eq!(amount.value(), dec!(1.5));
        assert_eq!(amount.to_raw().unwrap(), 1_500_000_000_000_000_000);

        // 500 units at 10^27 exceeds the backend mantissa unless zeros are stripped
        let quantity = FixedPoint::from_raw(500 * 10i128.pow(27), QUANTITY_SCALE).unwrap();
        assert_eq!(quantity.value(), dec!(500));
        assert_eq!(quantity.to_raw().unwrap(), 500 * 10i128.pow(27));
    }

    #[test]
    fn test_raw_not_representable() {
        let raw = 123_456_789_012_345_678_901_234_567_891i128;
        let result = FixedPoint::from_raw(raw, RATIO_SCALE);
        assert!(matches!(
            result,
            Err(ArithmeticError::NotRepresentable { .. })
        ));
    }

    #[test]
    fn test_mul_rescales_product() {
        let price = FixedPoint::price(dec!(1.02), &ctx());
        let quantity = FixedPoint::quantity(dec!(500), &ctx());
        let amount = price.mul(&quantity, CURRENCY_SCALE, &ctx()).unwrap();
        assert_eq!(amount.value(), dec!(510));
        assert_eq!(amount.scale(), CURRENCY_SCALE);

        let third = FixedPoint::currency(dec!(0.333333), 6, &ctx());
        let rounded = third.mul(&third, 6, &ctx()).unwrap();
        assert_eq!(rounded.value(), dec!(0.111111));
    }

    #[test]
    fn test_div() {
        let amount = FixedPoint::currency(dec!(100), 18, &ctx());
        let price = FixedPoint::price(dec!(3), &ctx());
        let quantity = amount.div(&price, 6, &ctx()).unwrap();
        assert_eq!(quantity.value(), dec!(33.333333));

        let zero = FixedPoint::zero(ORACLE_PRICE_SCALE);
        assert_eq!(
            amount.div(&zero, 6, &ctx()),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn test_add_sub_keep_wider_scale() {
        let a = FixedPoint::currency(dec!(1.5), 6, &ctx());
        let b = FixedPoint::currency(dec!(0.25), 18, &ctx());
        assert_eq!(a.add(&b, &ctx()).unwrap().scale(), 18);
        assert_eq!(a.sub(&b, &ctx()).unwrap().value(), dec!(1.25));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let big = FixedPoint::new(dec!(1000000000000000), 0, &ctx());
        assert_eq!(
            big.mul(&big, CURRENCY_SCALE, &ctx()),
            Err(ArithmeticError::Overflow)
        );

        let max = FixedPoint::new(Decimal::MAX, 0, &ctx());
        assert_eq!(max.add(&max, &ctx()), Err(ArithmeticError::Overflow));
        assert_eq!(max.neg().sub(&max, &ctx()), Err(ArithmeticError::Overflow));
    }

    #[test]
    fn test_deserialize_checks_scale() {
        let value: FixedPoint =
            serde_json::from_str(r#"{ "value": "1.2300", "scale": 2 }"#).unwrap();
        assert_eq!(value.value(), dec!(1.23));
        assert_eq!(value.to_raw().unwrap(), 123);

        let excess = serde_json::from_str::<FixedPoint>(r#"{ "value": "1.23456", "scale": 2 }"#);
        assert!(excess.unwrap_err().to_string().contains("fractional digits"));

        let too_wide = serde_json::from_str::<FixedPoint>(r#"{ "value": "1", "scale": 40 }"#);
        assert!(too_wide.unwrap_err().to_string().contains("Scale 40"));
    }

    #[test]
    fn test_compare_across_scales() {
        let a = FixedPoint::currency(dec!(2), 6, &ctx());
        let b = FixedPoint::price(dec!(2), &ctx());
        assert_eq!(a, b);
        assert!(FixedPoint::currency(dec!(1.9), 18, &ctx()) < b);
    }

    #[test]
    fn test_clamp_and_minmax() {
        let negative = FixedPoint::currency(dec!(-3), 18, &ctx());
        assert!(negative.clamp_non_negative().is_zero());

        let a = FixedPoint::currency(dec!(4), 18, &ctx());
        assert_eq!(a.min(negative), negative);
        assert_eq!(a.max(negative), a);
    }

    #[test]
    fn test_percent_conversion() {
        let percent = FixedPoint::new(dec!(5), PERCENT_SCALE, &ctx());
        let ratio = ratio_from_percent(&percent, &ctx());
        assert_eq!(ratio.value(), dec!(0.05));
        assert_eq!(percent_from_ratio(&ratio, &ctx()).unwrap().value(), dec!(5));
    }

    #[test]
    fn test_scale_factor() {
        assert_eq!(scale_factor(18), Some(Decimal::from(10i64.pow(18))));
        assert!(scale_factor(27).is_some());
        assert!(scale_factor(29).is_none());
    }
}
