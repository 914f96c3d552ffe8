//! Pool fees - NAV-capped charges drawn from the pool

use serde::{Deserialize, Serialize};

use super::context::DecimalContext;
use super::fixed_point::FixedPoint;
use crate::error::ArithmeticError;

pub type FeeId = String;

/// Fee accrual type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// Accrues automatically at a fixed rate; never charged by hand
    Fixed,
    /// Charged on demand, up to a share of NAV
    Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeAmounts {
    /// Fraction of NAV the fee may charge, at ratio scale
    pub percent_of_nav: FixedPoint,
    /// Charged but not yet disbursed (pool currency)
    pub pending: FixedPoint,
}

/// Pool fee snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFee {
    /// On-chain fee id; a fee selected in a form may not carry one yet
    #[serde(default)]
    pub id: Option<FeeId>,
    #[serde(rename = "type")]
    pub kind: FeeKind,
    pub amounts: FeeAmounts,
}

impl PoolFee {
    pub fn new(
        id: impl Into<FeeId>,
        kind: FeeKind,
        percent_of_nav: FixedPoint,
        pending: FixedPoint,
    ) -> Self {
        Self {
            id: Some(id.into()),
            kind,
            amounts: FeeAmounts {
                percent_of_nav,
                pending,
            },
        }
    }

    /// `percent_of_nav × aum`, at the scale of `aum`
    pub fn max_charge(
        &self,
        aum: &FixedPoint,
        ctx: &DecimalContext,
    ) -> Result<FixedPoint, ArithmeticError> {
        self.amounts.percent_of_nav.mul(aum, aum.scale(), ctx)
    }

    /// Only fees charged up to a NAV share are charged by hand
    pub fn is_chargeable(&self) -> bool {
        self.kind == FeeKind::Variable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_charge() {
        let ctx = DecimalContext::default();
        let fee = PoolFee::new(
            "3",
            FeeKind::Variable,
            FixedPoint::ratio(dec!(0.01), &ctx),
            FixedPoint::zero(18),
        );
        let aum = FixedPoint::currency(dec!(4000), 18, &ctx);
        assert_eq!(fee.max_charge(&aum, &ctx).unwrap().value(), dec!(40));
        assert!(fee.is_chargeable());
    }

    #[test]
    fn test_fixed_fee_not_chargeable() {
        let ctx = DecimalContext::default();
        let fee = PoolFee::new(
            "4",
            FeeKind::Fixed,
            FixedPoint::ratio(dec!(0.01), &ctx),
            FixedPoint::zero(18),
        );
        assert!(!fee.is_chargeable());
    }

    #[test]
    fn test_fee_type_field_name() {
        let json = serde_json::json!({
            "id": "1",
            "type": "variable",
            "amounts": {
                "percent_of_nav": { "value": "0.02", "scale": 27 },
                "pending": { "value": "12.5", "scale": 18 }
            }
        });
        let fee: PoolFee = serde_json::from_value(json).unwrap();
        assert_eq!(fee.kind, FeeKind::Variable);
        assert_eq!(fee.amounts.pending.value(), dec!(12.5));
    }
}
