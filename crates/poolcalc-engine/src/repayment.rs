//! Repayment validation
//!
//! Checks a repay form against the borrower's wallet and the loan's debt and
//! builds the repay leg. Repayments settle interest first, then principal.

use poolcalc_common::config::ExternalSettings;
use poolcalc_common::{
    DecimalContext, EngineConfig, ExternalPricing, FixedPoint, Loan, LoanOperation, LoanPricing,
    Pool, PreconditionError, PrincipalLeg, RepayLeg, Result, Validated, ValidationError,
    ValidationErrors, WalletBalance, ORACLE_PRICE_SCALE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::financing::AvailableFinancingCalculator;
use crate::settlement::SettlementCalculator;

/// Repay form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepayRequest {
    /// Currency amount for an internal loan
    Amount { amount: FixedPoint },
    /// Units sold back at a settlement price, plus interest
    Priced {
        quantity: FixedPoint,
        price: FixedPoint,
        interest: FixedPoint,
    },
}

impl RepayRequest {
    fn kind(&self) -> &'static str {
        match self {
            RepayRequest::Amount { .. } => "internal",
            RepayRequest::Priced { .. } => "external",
        }
    }
}

/// Accepted repayment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepayPlan {
    /// Total currency leaving the wallet
    pub amount: FixedPoint,
    pub repay: RepayLeg,
}

impl RepayPlan {
    /// `repay` operation for `loan`; the loan must have a borrower
    pub fn into_operation(self, loan: &Loan) -> Result<LoanOperation> {
        if loan.borrower.is_none() {
            return Err(PreconditionError::MissingBorrower {
                loan_id: loan.id.clone(),
            }
            .into());
        }

        Ok(LoanOperation::Repay {
            pool_id: loan.pool_id.clone(),
            loan_id: loan.id.clone(),
            repay: self.repay,
        })
    }
}

/// Repay form validator
#[derive(Debug, Clone)]
pub struct RepaymentValidator {
    ctx: DecimalContext,
    financing: AvailableFinancingCalculator,
    settlement: SettlementCalculator,
    /// Price variation for loans that set none
    default_max_price_variation: FixedPoint,
}

impl RepaymentValidator {
    pub fn new(
        ctx: DecimalContext,
        financing: AvailableFinancingCalculator,
        external: &ExternalSettings,
    ) -> Self {
        Self {
            ctx,
            financing,
            settlement: SettlementCalculator::new(ctx),
            default_max_price_variation: FixedPoint::ratio(
                external.default_max_price_variation,
                &ctx,
            ),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.context(),
            AvailableFinancingCalculator::from_config(config),
            &config.external,
        )
    }

    /// `max(min(wallet, outstanding_debt) − Σ reserved_fees, 0)`
    pub fn max_repayable(
        &self,
        loan: &Loan,
        wallet: &WalletBalance,
        reserved_fees: &[FixedPoint],
    ) -> Result<FixedPoint> {
        let debt = loan.outstanding_debt(&self.ctx)?;
        let reserved = reserved_fees
            .iter()
            .try_fold(FixedPoint::zero(debt.scale()), |sum, fee| sum.add(fee, &self.ctx))?;

        Ok(wallet
            .amount
            .min(debt)
            .sub(&reserved, &self.ctx)?
            .clamp_non_negative())
    }

    /// Whether the wallet covers the debt with margin
    pub fn can_repay_all(&self, pool: &Pool, loan: &Loan, wallet: &WalletBalance) -> Result<bool> {
        Ok(self.financing.debt_with_margin(pool, loan)? <= wallet.amount)
    }

    /// Lowest and highest settlement price accepted for `pricing`
    pub fn price_band(&self, pricing: &ExternalPricing) -> Result<(FixedPoint, FixedPoint)> {
        let variation = pricing
            .max_price_variation
            .unwrap_or(self.default_max_price_variation);
        let one = FixedPoint::ratio(rust_decimal::Decimal::ONE, &self.ctx);

        let low = pricing.oracle_value.mul(
            &one.sub(&variation, &self.ctx)?,
            ORACLE_PRICE_SCALE,
            &self.ctx,
        )?;
        let high = pricing.oracle_value.mul(
            &one.add(&variation, &self.ctx)?,
            ORACLE_PRICE_SCALE,
            &self.ctx,
        )?;
        Ok((low, high))
    }

    /// Check a repay form.
    ///
    /// Fails with [`PreconditionError::PricingMismatch`] when the request
    /// kind does not match the loan's pricing.
    #[instrument(skip_all, fields(pool_id = %pool.id, loan_id = %loan.id, kind = request.kind()))]
    pub fn validate(
        &self,
        pool: &Pool,
        loan: &Loan,
        wallet: &WalletBalance,
        reserved_fees: &[FixedPoint],
        request: &RepayRequest,
    ) -> Result<Validated<RepayPlan>> {
        let max = self.max_repayable(loan, wallet, reserved_fees)?;
        let mut errors = ValidationErrors::new();
        errors.ensure(loan.is_active(), "loan", ValidationError::LoanNotActive);

        let plan = match (&loan.pricing, request) {
            (LoanPricing::Internal(_), RepayRequest::Amount { amount }) => {
                errors.ensure(amount.is_positive(), "amount", ValidationError::NotPositive);
                errors.ensure(
                    *amount <= max,
                    "amount",
                    ValidationError::ExceedsMaxRepayable { max },
                );
                self.internal_plan(loan, amount)?
            }
            (
                LoanPricing::External(pricing),
                RepayRequest::Priced {
                    quantity,
                    price,
                    interest,
                },
            ) => {
                errors.ensure(quantity.is_positive(), "quantity", ValidationError::NotPositive);
                errors.ensure(price.is_positive(), "price", ValidationError::NotPositive);
                errors.ensure(!interest.is_negative(), "interest", ValidationError::Negative);
                errors.ensure(
                    *quantity <= pricing.outstanding_quantity,
                    "quantity",
                    ValidationError::ExceedsOutstanding {
                        max: pricing.outstanding_quantity,
                    },
                );
                errors.ensure(
                    *interest <= loan.outstanding_interest,
                    "interest",
                    ValidationError::ExceedsOutstanding {
                        max: loan.outstanding_interest,
                    },
                );

                let (low, high) = self.price_band(pricing)?;
                errors.ensure(
                    *price >= low && *price <= high,
                    "price",
                    ValidationError::PriceOutsideVariance {
                        price: *price,
                        min: low,
                        max: high,
                    },
                );

                let plan = self.external_plan(pool, quantity, price, interest)?;
                errors.ensure(
                    plan.amount <= max,
                    "amount",
                    ValidationError::ExceedsMaxRepayable { max },
                );
                plan
            }
            (LoanPricing::Internal(_), RepayRequest::Priced { .. })
            | (LoanPricing::External(_), RepayRequest::Amount { .. }) => {
                return Err(PreconditionError::PricingMismatch {
                    loan_id: loan.id.clone(),
                    expected: loan.pricing.kind(),
                    actual: request.kind(),
                }
                .into());
            }
        };

        if errors.is_empty() {
            debug!(amount = %plan.amount, max = %max, "Repayment accepted");
        } else {
            warn!(%errors, "Repayment rejected");
        }
        Ok(errors.into_result(plan))
    }

    /// Plan repaying the whole debt with margin.
    ///
    /// The wallet must cover the same debt with margin that
    /// [`Self::can_repay_all`] checks. The repaid principal is the full
    /// outstanding principal (or held quantity at the oracle price).
    /// - Internal: everything above the principal is booked as interest
    /// - External: the margin is the oracle value of the holding, and the
    ///   outstanding interest is settled out of that amount
    #[instrument(skip_all, fields(pool_id = %pool.id, loan_id = %loan.id))]
    pub fn repay_all_plan(
        &self,
        pool: &Pool,
        loan: &Loan,
        wallet: &WalletBalance,
    ) -> Result<Validated<RepayPlan>> {
        let mut errors = ValidationErrors::new();
        errors.ensure(loan.is_active(), "loan", ValidationError::LoanNotActive);

        let total = self.financing.debt_with_margin(pool, loan)?;
        let plan = match &loan.pricing {
            LoanPricing::Internal(_) => RepayPlan {
                amount: total,
                repay: RepayLeg {
                    principal: PrincipalLeg::Internal {
                        amount: loan.outstanding_principal,
                    },
                    interest: total
                        .sub(&loan.outstanding_principal, &self.ctx)?
                        .clamp_non_negative(),
                    unscheduled: FixedPoint::zero(total.scale()),
                },
            },
            LoanPricing::External(pricing) => RepayPlan {
                amount: total,
                repay: RepayLeg {
                    principal: PrincipalLeg::External {
                        quantity: pricing.outstanding_quantity,
                        price: pricing.oracle_value,
                    },
                    interest: loan.outstanding_interest.min(total).clamp_non_negative(),
                    unscheduled: FixedPoint::zero(total.scale()),
                },
            },
        };

        errors.ensure(
            plan.amount <= wallet.amount,
            "amount",
            ValidationError::InsufficientBalance {
                required: plan.amount,
                available: wallet.amount,
            },
        );

        if !errors.is_empty() {
            warn!(%errors, "Repay-all rejected");
        }
        Ok(errors.into_result(plan))
    }

    fn internal_plan(&self, loan: &Loan, amount: &FixedPoint) -> Result<RepayPlan> {
        let interest = amount.min(&loan.outstanding_interest).clamp_non_negative();
        let principal = amount
            .sub(&loan.outstanding_interest, &self.ctx)?
            .clamp_non_negative();

        Ok(RepayPlan {
            amount: *amount,
            repay: RepayLeg {
                principal: PrincipalLeg::Internal { amount: principal },
                interest: interest.rescale(amount.scale(), &self.ctx),
                unscheduled: FixedPoint::zero(amount.scale()),
            },
        })
    }

    fn external_plan(
        &self,
        pool: &Pool,
        quantity: &FixedPoint,
        price: &FixedPoint,
        interest: &FixedPoint,
    ) -> Result<RepayPlan> {
        let principal = self
            .settlement
            .settlement_amount(price, quantity, pool.currency_scale())?;

        Ok(RepayPlan {
            amount: principal.add(interest, &self.ctx)?,
            repay: RepayLeg {
                principal: PrincipalLeg::External {
                    quantity: *quantity,
                    price: *price,
                },
                interest: *interest,
                unscheduled: FixedPoint::zero(pool.currency_scale()),
            },
        })
    }
}
