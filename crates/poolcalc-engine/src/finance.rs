//! Borrow and finance forms
//!
//! Mirrors the checks the chain runs on `borrow`: a positive amount, a loan
//! that is neither closed nor past maturity, and an amount inside both the
//! loan's available financing and the pool reserve.

use chrono::{DateTime, Utc};
use poolcalc_common::{
    DecimalContext, FixedPoint, Loan, LoanOperation, LoanPricing, LoanStatus, Pool,
    PreconditionError, PrincipalLeg, Result, Validated, ValidationError, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::financing::AvailableFinancingCalculator;
use crate::settlement::SettlementCalculator;

/// Finance form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinanceRequest {
    Amount { amount: FixedPoint },
    Priced {
        quantity: FixedPoint,
        price: FixedPoint,
    },
}

impl FinanceRequest {
    fn kind(&self) -> &'static str {
        match self {
            FinanceRequest::Amount { .. } => "internal",
            FinanceRequest::Priced { .. } => "external",
        }
    }
}

/// Accepted financing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancePlan {
    /// Currency drawn from the reserve
    pub amount: FixedPoint,
    pub principal: PrincipalLeg,
}

impl FinancePlan {
    /// `borrow` or `financeExternalLoan` for `loan`
    pub fn into_operation(self, loan: &Loan) -> Result<LoanOperation> {
        if loan.borrower.is_none() {
            return Err(PreconditionError::MissingBorrower {
                loan_id: loan.id.clone(),
            }
            .into());
        }

        match (&loan.pricing, self.principal) {
            (LoanPricing::Internal(_), PrincipalLeg::Internal { amount }) => Ok(LoanOperation::Borrow {
                pool_id: loan.pool_id.clone(),
                loan_id: loan.id.clone(),
                amount,
            }),
            (LoanPricing::External(pricing), PrincipalLeg::External { quantity, price }) => {
                Ok(LoanOperation::FinanceExternalLoan {
                    pool_id: loan.pool_id.clone(),
                    loan_id: loan.id.clone(),
                    quantity,
                    price,
                    amount: self.amount,
                    isin: pricing.isin.clone(),
                })
            }
            (LoanPricing::Internal(_), PrincipalLeg::External { .. })
            | (LoanPricing::External(_), PrincipalLeg::Internal { .. }) => {
                Err(PreconditionError::PricingMismatch {
                    loan_id: loan.id.clone(),
                    expected: loan.pricing.kind(),
                    actual: if loan.is_external() { "internal" } else { "external" },
                }
                .into())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinanceValidator {
    financing: AvailableFinancingCalculator,
    settlement: SettlementCalculator,
}

impl FinanceValidator {
    pub fn new(ctx: DecimalContext, financing: AvailableFinancingCalculator) -> Self {
        Self {
            financing,
            settlement: SettlementCalculator::new(ctx),
        }
    }

    /// Check a finance form at time `now`
    #[instrument(skip_all, fields(pool_id = %pool.id, loan_id = %loan.id, kind = request.kind()))]
    pub fn validate(
        &self,
        pool: &Pool,
        loan: &Loan,
        request: &FinanceRequest,
        now: DateTime<Utc>,
    ) -> Result<Validated<FinancePlan>> {
        let mut errors = ValidationErrors::new();
        errors.ensure(
            loan.status != LoanStatus::Closed,
            "loan",
            ValidationError::LoanClosed,
        );
        errors.ensure(!loan.is_matured(now), "loan", ValidationError::MaturityPassed);

        let available = self.financing.compute(pool, loan)?.current;

        let plan = match (&loan.pricing, request) {
            (LoanPricing::Internal(_), FinanceRequest::Amount { amount }) => {
                errors.ensure(amount.is_positive(), "amount", ValidationError::NotPositive);
                errors.ensure(
                    *amount <= available,
                    "amount",
                    ValidationError::ExceedsAvailableFinancing { max: available },
                );
                FinancePlan {
                    amount: *amount,
                    principal: PrincipalLeg::Internal { amount: *amount },
                }
            }
            (LoanPricing::External(_), FinanceRequest::Priced { quantity, price }) => {
                errors.ensure(quantity.is_positive(), "quantity", ValidationError::NotPositive);
                errors.ensure(price.is_positive(), "price", ValidationError::NotPositive);
                errors.ensure(
                    *quantity <= available,
                    "quantity",
                    ValidationError::ExceedsAvailableFinancing { max: available },
                );
                FinancePlan {
                    amount: self
                        .settlement
                        .settlement_amount(price, quantity, pool.currency_scale())?,
                    principal: PrincipalLeg::External {
                        quantity: *quantity,
                        price: *price,
                    },
                }
            }
            (LoanPricing::Internal(_), FinanceRequest::Priced { .. })
            | (LoanPricing::External(_), FinanceRequest::Amount { .. }) => {
                return Err(PreconditionError::PricingMismatch {
                    loan_id: loan.id.clone(),
                    expected: loan.pricing.kind(),
                    actual: request.kind(),
                }
                .into());
            }
        };

        errors.ensure(
            plan.amount <= pool.reserve.available,
            "amount",
            ValidationError::ExceedsReserve {
                max: pool.reserve.available,
            },
        );

        if errors.is_empty() {
            debug!(amount = %plan.amount, available = %available, "Financing accepted");
        } else {
            warn!(%errors, "Financing rejected");
        }
        Ok(errors.into_result(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use poolcalc_common::{
        AccountId, CurrencyMeta, EngineConfig, EngineError, ExternalPricing, InternalPricing,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ctx() -> DecimalContext {
        DecimalContext::default()
    }

    fn validator() -> FinanceValidator {
        let config = EngineConfig::default();
        FinanceValidator::new(
            config.context(),
            AvailableFinancingCalculator::from_config(&config),
        )
    }

    fn currency(value: Decimal) -> FixedPoint {
        FixedPoint::currency(value, 18, &ctx())
    }

    fn pool(reserve: Decimal) -> Pool {
        Pool::new("pool-1", CurrencyMeta::new(18, "USDC")).with_reserve(currency(reserve))
    }

    fn internal_loan() -> Loan {
        let ctx = ctx();
        let pricing = InternalPricing::new(
            currency(dec!(2000)),
            FixedPoint::ratio(dec!(0.8), &ctx),
            FixedPoint::zero(27),
        );
        Loan::new("1", "pool-1", LoanPricing::Internal(pricing), 18)
            .with_borrower(AccountId::new("borrower"))
    }

    fn external_loan() -> Loan {
        let ctx = ctx();
        let pricing = ExternalPricing::new(
            "US912828XG55",
            FixedPoint::price(dec!(1.02), &ctx),
            FixedPoint::quantity(dec!(500), &ctx),
            currency(dec!(1)),
        )
        .with_max_quantity(FixedPoint::quantity(dec!(1000), &ctx));
        Loan::new("2", "pool-1", LoanPricing::External(pricing), 18)
            .with_status(LoanStatus::Active)
            .with_borrower(AccountId::new("borrower"))
    }

    fn amount(value: Decimal) -> FinanceRequest {
        FinanceRequest::Amount {
            amount: currency(value),
        }
    }

    #[test]
    fn test_borrow_within_ceiling() {
        let loan = internal_loan();
        let plan = validator()
            .validate(&pool(dec!(5000)), &loan, &amount(dec!(1600)), Utc::now())
            .unwrap()
            .unwrap();

        let op = plan.into_operation(&loan).unwrap();
        assert_eq!(
            op,
            LoanOperation::Borrow {
                pool_id: "pool-1".to_string(),
                loan_id: "1".to_string(),
                amount: currency(dec!(1600)),
            }
        );
    }

    #[test]
    fn test_borrow_limits() {
        let errors = validator()
            .validate(&pool(dec!(5000)), &internal_loan(), &amount(dec!(1601)), Utc::now())
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            errors.get("amount"),
            Some(ValidationError::ExceedsAvailableFinancing { .. })
        ));

        let errors = validator()
            .validate(&pool(dec!(100)), &internal_loan(), &amount(dec!(150)), Utc::now())
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            errors.get("amount"),
            Some(ValidationError::ExceedsReserve { .. })
        ));
    }

    #[test]
    fn test_matured_and_closed_loans_rejected() {
        let now = Utc::now();
        let mut matured = internal_loan();
        if let LoanPricing::Internal(pricing) = &mut matured.pricing {
            pricing.maturity_date = Some(now - Duration::hours(1));
        }
        let errors = validator()
            .validate(&pool(dec!(5000)), &matured, &amount(dec!(10)), now)
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("loan"), Some(&ValidationError::MaturityPassed));

        let closed = internal_loan().with_status(LoanStatus::Closed);
        let errors = validator()
            .validate(&pool(dec!(5000)), &closed, &amount(dec!(10)), now)
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("loan"), Some(&ValidationError::LoanClosed));
    }

    #[test]
    fn test_finance_external_loan() {
        let ctx = ctx();
        let loan = external_loan();
        let request = FinanceRequest::Priced {
            quantity: FixedPoint::quantity(dec!(400), &ctx),
            price: currency(dec!(1.01)),
        };
        let plan = validator()
            .validate(&pool(dec!(5000)), &loan, &request, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount.value(), dec!(404));

        match plan.into_operation(&loan).unwrap() {
            LoanOperation::FinanceExternalLoan { isin, amount, .. } => {
                assert_eq!(isin, "US912828XG55");
                assert_eq!(amount.value(), dec!(404));
            }
            other => panic!("unexpected operation {}", other.name()),
        }
    }

    #[test]
    fn test_external_quantity_cap() {
        let ctx = ctx();
        let request = FinanceRequest::Priced {
            quantity: FixedPoint::quantity(dec!(501), &ctx),
            price: currency(dec!(1)),
        };
        let errors = validator()
            .validate(&pool(dec!(5000)), &external_loan(), &request, Utc::now())
            .unwrap()
            .unwrap_err();
        assert!(errors.has("quantity"));
    }

    #[test]
    fn test_mismatch_is_precondition() {
        let result =
            validator().validate(&pool(dec!(5000)), &external_loan(), &amount(dec!(1)), Utc::now());
        assert!(matches!(
            result,
            Err(EngineError::Precondition(PreconditionError::PricingMismatch { .. }))
        ));
    }
}
