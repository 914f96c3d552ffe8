//! Debt correction
//!
//! A correction moves a loan's principal to a new target without any cash
//! leaving the pool. The engine computes the signed difference between the
//! target and the current state and emits an `increaseDebt` or
//! `decreaseDebt` operation for it.
//!
//! External loans are corrected in quantity terms: the emitted leg carries
//! `|target_quantity − outstanding_quantity|` at the target price, and the
//! settlement value of the target is reported alongside.

use poolcalc_common::{
    ArithmeticError, DecimalContext, FixedPoint, Loan, LoanOperation, LoanPricing, Pool,
    PreconditionError, PrincipalLeg, Result, Validated, ValidationError, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::financing::AvailableFinancingCalculator;
use crate::settlement::SettlementCalculator;

/// Requested end state of a correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectionTarget {
    /// New outstanding principal of an internal loan
    Principal { amount: FixedPoint },
    /// New holding of an external loan
    Priced {
        price: FixedPoint,
        quantity: FixedPoint,
    },
}

impl CorrectionTarget {
    fn kind(&self) -> &'static str {
        match self {
            CorrectionTarget::Principal { .. } => "internal",
            CorrectionTarget::Priced { .. } => "external",
        }
    }
}

/// Signed principal change produced by a correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionDelta {
    pub is_increase: bool,
    /// Magnitude of the change in the loan's pricing terms
    pub principal: PrincipalLeg,
    /// Settlement value of the target (`price × quantity`, external only)
    pub target_amount: Option<FixedPoint>,
}

impl CorrectionDelta {
    /// Magnitude in the corrected unit: currency amount or quantity
    pub fn magnitude(&self) -> FixedPoint {
        match &self.principal {
            PrincipalLeg::Internal { amount } => *amount,
            PrincipalLeg::External { quantity, .. } => *quantity,
        }
    }

    /// Apply the delta to a previous principal or quantity
    pub fn apply_to(
        &self,
        previous: &FixedPoint,
        ctx: &DecimalContext,
    ) -> std::result::Result<FixedPoint, ArithmeticError> {
        let magnitude = self.magnitude();
        if self.is_increase {
            previous.add(&magnitude, ctx)
        } else {
            previous.sub(&magnitude, ctx)
        }
    }

    /// `increaseDebt` or `decreaseDebt` for `loan`.
    ///
    /// A decrease carries explicit zero interest and unscheduled parts.
    pub fn into_operation(self, loan: &Loan) -> LoanOperation {
        if self.is_increase {
            return LoanOperation::IncreaseDebt {
                pool_id: loan.pool_id.clone(),
                loan_id: loan.id.clone(),
                principal: self.principal,
            };
        }

        let scale = loan.outstanding_interest.scale();
        LoanOperation::DecreaseDebt {
            pool_id: loan.pool_id.clone(),
            loan_id: loan.id.clone(),
            principal: self.principal,
            interest: FixedPoint::zero(scale),
            unscheduled: FixedPoint::zero(scale),
        }
    }
}

/// Correction calculator and validator
#[derive(Debug, Clone)]
pub struct DebtCorrectionEngine {
    ctx: DecimalContext,
    financing: AvailableFinancingCalculator,
    settlement: SettlementCalculator,
}

impl DebtCorrectionEngine {
    pub fn new(ctx: DecimalContext, financing: AvailableFinancingCalculator) -> Self {
        Self {
            ctx,
            financing,
            settlement: SettlementCalculator::new(ctx),
        }
    }

    /// Delta between `loan` and `target`.
    ///
    /// Fails with [`PreconditionError::PricingMismatch`] when the target
    /// kind does not match the loan's pricing.
    #[instrument(skip_all, fields(loan_id = %loan.id, kind = loan.pricing.kind()))]
    pub fn compute(&self, pool: &Pool, loan: &Loan, target: &CorrectionTarget) -> Result<CorrectionDelta> {
        let delta = match (&loan.pricing, target) {
            (LoanPricing::Internal(_), CorrectionTarget::Principal { amount }) => {
                let diff = amount.sub(&loan.outstanding_principal, &self.ctx)?;
                CorrectionDelta {
                    is_increase: diff.is_positive(),
                    principal: PrincipalLeg::Internal { amount: diff.abs() },
                    target_amount: None,
                }
            }
            (LoanPricing::External(pricing), CorrectionTarget::Priced { price, quantity }) => {
                let target_amount =
                    self.settlement
                        .settlement_amount(price, quantity, pool.currency_scale())?;
                let delta = self
                    .settlement
                    .compute_delta(&pricing.outstanding_quantity, quantity)?;
                CorrectionDelta {
                    is_increase: delta.is_increase,
                    principal: PrincipalLeg::External {
                        quantity: delta.diff_quantity,
                        price: *price,
                    },
                    target_amount: Some(target_amount),
                }
            }
            (LoanPricing::Internal(_), CorrectionTarget::Priced { .. })
            | (LoanPricing::External(_), CorrectionTarget::Principal { .. }) => {
                return Err(PreconditionError::PricingMismatch {
                    loan_id: loan.id.clone(),
                    expected: loan.pricing.kind(),
                    actual: target.kind(),
                }
                .into());
            }
        };

        debug!(
            is_increase = delta.is_increase,
            magnitude = %delta.magnitude(),
            "Computed correction delta"
        );
        Ok(delta)
    }

    /// Compute and check a correction.
    ///
    /// The outer error is a precondition failure; the inner one carries the
    /// field errors a user can fix.
    pub fn validate(
        &self,
        pool: &Pool,
        loan: &Loan,
        target: &CorrectionTarget,
    ) -> Result<Validated<CorrectionDelta>> {
        let delta = self.compute(pool, loan, target)?;
        let mut errors = ValidationErrors::new();

        errors.ensure(loan.is_active(), "loan", ValidationError::LoanNotActive);

        match target {
            CorrectionTarget::Principal { amount } => {
                errors.ensure(!amount.is_negative(), "principal", ValidationError::Negative);
            }
            CorrectionTarget::Priced { price, quantity } => {
                errors.ensure(!quantity.is_negative(), "quantity", ValidationError::Negative);
                errors.ensure(price.is_positive(), "price", ValidationError::NotPositive);
            }
        }

        if delta.is_increase {
            let available = self.financing.compute(pool, loan)?.current;
            let field = match target {
                CorrectionTarget::Principal { .. } => "principal",
                CorrectionTarget::Priced { .. } => "quantity",
            };
            errors.ensure(
                delta.magnitude() <= available,
                field,
                ValidationError::ExceedsAvailableFinancing { max: available },
            );
        }

        if !errors.is_empty() {
            warn!(loan_id = %loan.id, %errors, "Correction rejected");
        }
        Ok(errors.into_result(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolcalc_common::{
        CurrencyMeta, EngineConfig, EngineError, ExternalPricing, InternalPricing, LoanStatus,
    };
    use rust_decimal_macros::dec;

    fn ctx() -> DecimalContext {
        DecimalContext::default()
    }

    fn engine() -> DebtCorrectionEngine {
        let config = EngineConfig::default();
        DebtCorrectionEngine::new(
            config.context(),
            AvailableFinancingCalculator::from_config(&config),
        )
    }

    fn pool() -> Pool {
        Pool::new("pool-1", CurrencyMeta::new(18, "USDC"))
    }

    fn internal_loan() -> Loan {
        let ctx = ctx();
        let pricing = InternalPricing::new(
            FixedPoint::currency(dec!(2000), 18, &ctx),
            FixedPoint::ratio(dec!(0.8), &ctx),
            FixedPoint::zero(27),
        );
        Loan::new("4", "pool-1", LoanPricing::Internal(pricing), 18)
            .with_status(LoanStatus::Active)
            .with_debt(
                FixedPoint::currency(dec!(500), 18, &ctx),
                FixedPoint::currency(dec!(20), 18, &ctx),
            )
    }

    fn external_loan() -> Loan {
        let ctx = ctx();
        let pricing = ExternalPricing::new(
            "US912828XG55",
            FixedPoint::price(dec!(1.02), &ctx),
            FixedPoint::quantity(dec!(500), &ctx),
            FixedPoint::currency(dec!(1), 18, &ctx),
        )
        .with_max_quantity(FixedPoint::quantity(dec!(1000), &ctx));
        Loan::new("5", "pool-1", LoanPricing::External(pricing), 18)
            .with_status(LoanStatus::Active)
    }

    fn principal(amount: rust_decimal::Decimal) -> CorrectionTarget {
        CorrectionTarget::Principal {
            amount: FixedPoint::currency(amount, 18, &ctx()),
        }
    }

    #[test]
    fn test_internal_increase() {
        let delta = engine().compute(&pool(), &internal_loan(), &principal(dec!(650))).unwrap();
        assert!(delta.is_increase);
        assert_eq!(delta.magnitude().value(), dec!(150));
        assert!(delta.target_amount.is_none());
    }

    #[test]
    fn test_internal_decrease_operation_has_zero_parts() {
        let loan = internal_loan();
        let delta = engine().compute(&pool(), &loan, &principal(dec!(420))).unwrap();
        assert!(!delta.is_increase);
        assert_eq!(delta.magnitude().value(), dec!(80));

        match delta.into_operation(&loan) {
            LoanOperation::DecreaseDebt {
                principal,
                interest,
                unscheduled,
                ..
            } => {
                assert_eq!(
                    principal,
                    PrincipalLeg::Internal {
                        amount: FixedPoint::currency(dec!(80), 18, &ctx())
                    }
                );
                assert!(interest.is_zero());
                assert!(unscheduled.is_zero());
            }
            other => panic!("unexpected operation {}", other.name()),
        }
    }

    #[test]
    fn test_external_correction_in_quantity() {
        let ctx = ctx();
        let loan = external_loan();
        let target = CorrectionTarget::Priced {
            price: FixedPoint::currency(dec!(1.05), 18, &ctx),
            quantity: FixedPoint::quantity(dec!(620), &ctx),
        };

        let delta = engine().compute(&pool(), &loan, &target).unwrap();
        assert!(delta.is_increase);
        assert_eq!(delta.target_amount.unwrap().value(), dec!(651));
        assert_eq!(
            delta.principal,
            PrincipalLeg::External {
                quantity: FixedPoint::quantity(dec!(120), &ctx),
                price: FixedPoint::currency(dec!(1.05), 18, &ctx),
            }
        );

        let op = delta.into_operation(&loan);
        assert_eq!(op.name(), "increaseDebt");
    }

    #[test]
    fn test_round_trip_reaches_target() {
        let ctx = ctx();
        let loan = internal_loan();
        let delta = engine().compute(&pool(), &loan, &principal(dec!(333.33))).unwrap();
        assert_eq!(
            delta.apply_to(&loan.outstanding_principal, &ctx).unwrap().value(),
            dec!(333.33)
        );
    }

    #[test]
    fn test_pricing_mismatch_is_precondition() {
        let result = engine().compute(&pool(), &external_loan(), &principal(dec!(10)));
        assert!(matches!(
            result,
            Err(EngineError::Precondition(PreconditionError::PricingMismatch { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_over_ceiling_increase() {
        // ceiling 1600, zero-rate margin equals debt of 520 -> 1080 available
        let errors = engine()
            .validate(&pool(), &internal_loan(), &principal(dec!(1700)))
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            errors.get("principal"),
            Some(ValidationError::ExceedsAvailableFinancing { .. })
        ));
    }

    #[test]
    fn test_validate_requires_active_loan() {
        let loan = internal_loan().with_status(LoanStatus::Closed);
        let errors = engine()
            .validate(&pool(), &loan, &principal(dec!(400)))
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("loan"), Some(&ValidationError::LoanNotActive));
    }

    #[test]
    fn test_validate_rejects_negative_target() {
        let errors = engine()
            .validate(&pool(), &internal_loan(), &principal(dec!(-5)))
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("principal"), Some(&ValidationError::Negative));
    }

    #[test]
    fn test_validate_accepts_decrease() {
        let delta = engine()
            .validate(&pool(), &internal_loan(), &principal(dec!(100)))
            .unwrap()
            .unwrap();
        assert!(!delta.is_increase);
    }
}
