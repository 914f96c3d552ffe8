//! Settlement math for oracle-priced assets
//!
//! An external amount is always `price × quantity`. The price is quoted in
//! pool currency and the quantity carries [`QUANTITY_SCALE`] digits, so a raw
//! on-chain product is brought back to currency by dividing out the quantity
//! scale.

use poolcalc_common::{ArithmeticError, DecimalContext, FixedPoint, QUANTITY_SCALE};
use serde::{Deserialize, Serialize};

/// Direction and size of a quantity change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityDelta {
    /// `true` finances more face value, `false` repays it
    pub is_increase: bool,
    /// Absolute difference between the two quantities
    pub diff_quantity: FixedPoint,
}

/// Price × quantity calculator
#[derive(Debug, Clone)]
pub struct SettlementCalculator {
    ctx: DecimalContext,
}

impl SettlementCalculator {
    pub fn new(ctx: DecimalContext) -> Self {
        Self { ctx }
    }

    /// `price × quantity` at the pool currency scale
    pub fn settlement_amount(
        &self,
        price: &FixedPoint,
        quantity: &FixedPoint,
        currency_scale: u32,
    ) -> Result<FixedPoint, ArithmeticError> {
        price.mul(quantity, currency_scale, &self.ctx)
    }

    /// Settlement on raw on-chain integers.
    ///
    /// `raw_price` is in units of `10^-decimals`, `raw_quantity` in units of
    /// `10^-27`; the result is in units of `10^-decimals`.
    pub fn settle_raw(
        &self,
        raw_price: i128,
        raw_quantity: i128,
        decimals: u32,
    ) -> Result<i128, ArithmeticError> {
        let price = FixedPoint::from_raw(raw_price, decimals)?;
        let quantity = FixedPoint::from_raw(raw_quantity, QUANTITY_SCALE)?;
        self.settlement_amount(&price, &quantity, decimals)?.to_raw()
    }

    /// A quantity read as a whole unit count
    pub fn unit_count(&self, quantity: &FixedPoint) -> FixedPoint {
        quantity.rescale(0, &self.ctx)
    }

    /// Units purchasable with `amount` at `price`
    pub fn quantity_for_amount(
        &self,
        amount: &FixedPoint,
        price: &FixedPoint,
    ) -> Result<FixedPoint, ArithmeticError> {
        amount.div(price, QUANTITY_SCALE, &self.ctx)
    }

    /// Signed change from `old_quantity` to `new_quantity`
    pub fn compute_delta(
        &self,
        old_quantity: &FixedPoint,
        new_quantity: &FixedPoint,
    ) -> Result<QuantityDelta, ArithmeticError> {
        let diff = new_quantity.sub(old_quantity, &self.ctx)?;
        Ok(QuantityDelta {
            is_increase: new_quantity > old_quantity,
            diff_quantity: diff.abs(),
        })
    }
}
