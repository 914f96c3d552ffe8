//! Debt transfer between two loans of one pool
//!
//! The source loan is repaid and the target loan borrows the same amount in
//! a single `transferLoanDebt` call. The repaid side settles interest first.

use poolcalc_common::{
    DecimalContext, FixedPoint, Loan, LoanOperation, LoanPricing, LoanStatus, Pool,
    PreconditionError, PrincipalLeg, RepayLeg, Result, Validated, ValidationError,
    ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::financing::AvailableFinancingCalculator;
use crate::settlement::SettlementCalculator;

/// Repay and borrow legs of a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTransfer {
    /// Currency amount moved between the loans
    pub amount: FixedPoint,
    /// Leg applied to the source loan
    pub repay: RepayLeg,
    /// Leg applied to the target loan
    pub borrow: PrincipalLeg,
}

impl DebtTransfer {
    /// Quantity or amount borrowed by the target, in its own terms
    pub fn borrowed(&self) -> FixedPoint {
        match &self.borrow {
            PrincipalLeg::Internal { amount } => *amount,
            PrincipalLeg::External { quantity, .. } => *quantity,
        }
    }

    pub fn into_operation(self, source: &Loan, target: &Loan) -> LoanOperation {
        LoanOperation::TransferLoanDebt {
            pool_id: source.pool_id.clone(),
            from_loan_id: source.id.clone(),
            to_loan_id: target.id.clone(),
            repay: self.repay,
            borrow: self.borrow,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebtTransferCalculator {
    ctx: DecimalContext,
    financing: AvailableFinancingCalculator,
    settlement: SettlementCalculator,
}

impl DebtTransferCalculator {
    pub fn new(ctx: DecimalContext, financing: AvailableFinancingCalculator) -> Self {
        Self {
            ctx,
            financing,
            settlement: SettlementCalculator::new(ctx),
        }
    }

    /// Legs moving `finance_amount` from `source_loan` to `target_loan`.
    ///
    /// Both loans must belong to `source_pool`. Oracle-priced legs are
    /// settled at the loan's oracle value, which must not be zero.
    #[instrument(skip_all, fields(pool_id = %source_pool.id, from = %source_loan.id, to = %target_loan.id))]
    pub fn compute(
        &self,
        source_pool: &Pool,
        source_loan: &Loan,
        target_loan: &Loan,
        finance_amount: &FixedPoint,
    ) -> Result<DebtTransfer> {
        ensure_same_pool(source_pool, source_loan, target_loan)?;

        let borrow = match &target_loan.pricing {
            LoanPricing::Internal(_) => PrincipalLeg::Internal {
                amount: *finance_amount,
            },
            LoanPricing::External(pricing) => PrincipalLeg::External {
                quantity: self
                    .settlement
                    .quantity_for_amount(finance_amount, &pricing.oracle_value)?,
                price: pricing.oracle_value,
            },
        };

        let outstanding_interest = &source_loan.outstanding_interest;
        let interest = finance_amount
            .min(outstanding_interest)
            .clamp_non_negative()
            .rescale(finance_amount.scale(), &self.ctx);
        let principal = finance_amount
            .sub(outstanding_interest, &self.ctx)?
            .clamp_non_negative();

        let principal = match &source_loan.pricing {
            LoanPricing::Internal(_) => PrincipalLeg::Internal { amount: principal },
            LoanPricing::External(pricing) => PrincipalLeg::External {
                quantity: self
                    .settlement
                    .quantity_for_amount(&principal, &pricing.oracle_value)?,
                price: pricing.oracle_value,
            },
        };

        let transfer = DebtTransfer {
            amount: *finance_amount,
            repay: RepayLeg {
                principal,
                interest,
                unscheduled: FixedPoint::zero(source_pool.currency_scale()),
            },
            borrow,
        };

        debug!(
            amount = %transfer.amount,
            interest = %transfer.repay.interest,
            borrowed = %transfer.borrowed(),
            "Computed debt transfer"
        );
        Ok(transfer)
    }

    /// Compute and check a transfer.
    ///
    /// The amount must be positive, fit within the target loan's available
    /// financing and not exceed the source loan's outstanding debt. An
    /// oracle-priced source may not give back more units than it holds.
    pub fn validate(
        &self,
        source_pool: &Pool,
        source_loan: &Loan,
        target_loan: &Loan,
        finance_amount: &FixedPoint,
    ) -> Result<Validated<DebtTransfer>> {
        ensure_same_pool(source_pool, source_loan, target_loan)?;

        let mut errors = ValidationErrors::new();
        for (field, loan) in [("source_loan", source_loan), ("target_loan", target_loan)] {
            if let LoanPricing::External(pricing) = &loan.pricing {
                errors.ensure(
                    pricing.oracle_value.is_positive(),
                    field,
                    ValidationError::OraclePriceMissing,
                );
            }
        }
        if !errors.is_empty() {
            warn!(from = %source_loan.id, to = %target_loan.id, %errors, "Debt transfer rejected");
            return Ok(Err(errors));
        }

        let transfer = self.compute(source_pool, source_loan, target_loan, finance_amount)?;

        errors.ensure(
            source_loan.id != target_loan.id,
            "target_loan",
            ValidationError::SameLoan,
        );
        errors.ensure(
            source_loan.is_active(),
            "source_loan",
            ValidationError::LoanNotActive,
        );
        errors.ensure(
            target_loan.status != LoanStatus::Closed,
            "target_loan",
            ValidationError::LoanClosed,
        );
        errors.ensure(
            finance_amount.is_positive(),
            "amount",
            ValidationError::NotPositive,
        );

        let available = self.financing.compute(source_pool, target_loan)?.current;
        errors.ensure(
            transfer.borrowed() <= available,
            "amount",
            ValidationError::ExceedsAvailableFinancing { max: available },
        );

        let outstanding = source_loan.outstanding_debt(&self.ctx)?;
        errors.ensure(
            *finance_amount <= outstanding,
            "amount",
            ValidationError::ExceedsOutstanding { max: outstanding },
        );

        if let (LoanPricing::External(pricing), PrincipalLeg::External { quantity, .. }) =
            (&source_loan.pricing, &transfer.repay.principal)
        {
            errors.ensure(
                *quantity <= pricing.outstanding_quantity,
                "quantity",
                ValidationError::ExceedsOutstanding {
                    max: pricing.outstanding_quantity,
                },
            );
        }

        if !errors.is_empty() {
            warn!(from = %source_loan.id, to = %target_loan.id, %errors, "Debt transfer rejected");
        }
        Ok(errors.into_result(transfer))
    }
}

fn ensure_same_pool(pool: &Pool, source_loan: &Loan, target_loan: &Loan) -> Result<()> {
    for loan in [source_loan, target_loan] {
        if loan.pool_id != pool.id {
            return Err(PreconditionError::PoolMismatch {
                loan_id: loan.id.clone(),
                pool_id: pool.id.clone(),
            }
            .into());
        }
    }
    Ok(())
}
