//! Available financing
//!
//! How much more a loan may borrow, and the debt a repay-all must cover.
//!
//! - Internal loans: a ceiling of `value × advance_rate`, reduced by either
//!   total borrowed or current debt with a 3-hour interest buffer
//! - External loans: a quantity ceiling reduced by held units

use poolcalc_common::config::{ExternalSettings, MarginSettings};
use poolcalc_common::types::rate::apr_from_rate_per_second;
use poolcalc_common::{
    BorrowCapPolicy, DecimalContext, EngineConfig, ExternalPricing, FixedPoint, InternalPricing,
    Loan, LoanPricing, Pool, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Borrow capacity of a loan
///
/// `current` and `initial` are currency amounts for internal loans and
/// quantities for external loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFinancing {
    /// Remaining capacity, never negative
    pub current: FixedPoint,
    /// Capacity before any borrowing
    pub initial: FixedPoint,
    /// Debt a repay-all must cover; `None` for inactive internal loans
    pub debt_with_margin: Option<FixedPoint>,
}

/// Available financing calculator
#[derive(Debug, Clone)]
pub struct AvailableFinancingCalculator {
    ctx: DecimalContext,
    /// `1 / periods_per_year`: the share of a year one margin window covers
    margin_fraction: FixedPoint,
    /// Quantity ceiling for external loans without one
    unbounded_quantity_cap: FixedPoint,
}

impl AvailableFinancingCalculator {
    pub fn new(ctx: DecimalContext, margin: &MarginSettings, external: &ExternalSettings) -> Self {
        let margin_fraction = FixedPoint::ratio(Decimal::ONE / margin.periods_per_year(), &ctx);
        let unbounded_quantity_cap = FixedPoint::quantity(external.unbounded_quantity_cap, &ctx);

        Self {
            ctx,
            margin_fraction,
            unbounded_quantity_cap,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.context(), &config.margin, &config.external)
    }

    /// Compute the available financing of `loan` in `pool`
    #[instrument(skip_all, fields(pool_id = %pool.id, loan_id = %loan.id, kind = loan.pricing.kind()))]
    pub fn compute(&self, pool: &Pool, loan: &Loan) -> Result<AvailableFinancing> {
        let financing = match &loan.pricing {
            LoanPricing::Internal(pricing) => self.compute_internal(pool, loan, pricing)?,
            LoanPricing::External(pricing) => self.compute_external(pool, pricing)?,
        };

        debug!(
            current = %financing.current,
            initial = %financing.initial,
            debt_with_margin = ?financing.debt_with_margin.map(|d| d.to_string()),
            "Computed available financing"
        );
        Ok(financing)
    }

    /// Debt with margin, or plain outstanding debt when no margin applies
    pub fn debt_with_margin(&self, pool: &Pool, loan: &Loan) -> Result<FixedPoint> {
        match self.compute(pool, loan)?.debt_with_margin {
            Some(debt_with_margin) => Ok(debt_with_margin),
            None => Ok(loan.outstanding_debt(&self.ctx)?),
        }
    }

    /// `value × advance_rate`, or the stored ceiling of a legacy loan
    pub fn initial_ceiling(&self, pool: &Pool, pricing: &InternalPricing) -> Result<FixedPoint> {
        match pricing.ceiling {
            Some(ceiling) => Ok(ceiling),
            None => Ok(pricing
                .value
                .mul(&pricing.advance_rate, pool.currency_scale(), &self.ctx)?),
        }
    }

    /// Outstanding debt plus one margin window of interest.
    ///
    /// `debt × (1 + APR / periods_per_year)`
    pub fn internal_debt_with_margin(
        &self,
        loan: &Loan,
        pricing: &InternalPricing,
    ) -> Result<FixedPoint> {
        let debt = loan.outstanding_debt(&self.ctx)?;
        let apr = apr_from_rate_per_second(&pricing.interest_rate_per_second, &self.ctx)?;
        let buffer = apr.mul(&self.margin_fraction, apr.scale(), &self.ctx)?;
        let factor = FixedPoint::ratio(Decimal::ONE, &self.ctx).add(&buffer, &self.ctx)?;
        Ok(debt.mul(&factor, debt.scale(), &self.ctx)?)
    }

    fn compute_internal(
        &self,
        pool: &Pool,
        loan: &Loan,
        pricing: &InternalPricing,
    ) -> Result<AvailableFinancing> {
        let initial = self.initial_ceiling(pool, pricing)?;

        if !loan.is_active() {
            return Ok(AvailableFinancing {
                current: initial,
                initial,
                debt_with_margin: None,
            });
        }

        let debt_with_margin = self.internal_debt_with_margin(loan, pricing)?;
        let used = match pricing.max_borrow_amount {
            BorrowCapPolicy::UpToTotalBorrowed => loan.total_borrowed,
            BorrowCapPolicy::UpToOutstandingDebt => debt_with_margin,
        };

        Ok(AvailableFinancing {
            current: initial.sub(&used, &self.ctx)?.clamp_non_negative(),
            initial,
            debt_with_margin: Some(debt_with_margin),
        })
    }

    fn compute_external(
        &self,
        pool: &Pool,
        pricing: &ExternalPricing,
    ) -> Result<AvailableFinancing> {
        let initial = pricing
            .max_borrow_quantity
            .unwrap_or(self.unbounded_quantity_cap);
        let current = initial
            .sub(&pricing.outstanding_quantity, &self.ctx)?
            .clamp_non_negative();
        let debt_with_margin = pricing.outstanding_quantity.mul(
            &pricing.oracle_value,
            pool.currency_scale(),
            &self.ctx,
        )?;

        Ok(AvailableFinancing {
            current,
            initial,
            debt_with_margin: Some(debt_with_margin),
        })
    }
}
