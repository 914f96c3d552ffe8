//! Loan snapshot and its pricing models
//!
//! A loan is priced one of two ways:
//! - `Internal`: debt accrues continuously from a per-second interest rate
//! - `External`: an oracle-priced asset held as a quantity at a unit price
//!
//! Callers must match on [`LoanPricing`] exhaustively; there is no fallback
//! arm that could route a new pricing kind through the wrong arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::DecimalContext;
use super::fixed_point::{FixedPoint, RATIO_SCALE};
use crate::error::ArithmeticError;
use super::pool::PoolId;
use super::wallet::AccountId;

pub type LoanId = String;

/// Loan lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Issued, never financed
    Created,
    /// Financed at least once
    Active,
    /// Repaid and closed on-chain
    Closed,
}

/// How the remaining borrow capacity of an internal loan is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorrowCapPolicy {
    /// Ceiling minus everything ever borrowed; repayments do not free capacity
    UpToTotalBorrowed,
    /// Ceiling minus current debt with margin; repayments free capacity
    UpToOutstandingDebt,
}

impl Default for BorrowCapPolicy {
    fn default() -> Self {
        BorrowCapPolicy::UpToOutstandingDebt
    }
}

/// Interest-accruing loan pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalPricing {
    /// Appraised collateral value (pool currency)
    pub value: FixedPoint,
    /// Fraction of `value` that may be borrowed
    pub advance_rate: FixedPoint,
    /// Per-second compounding factor at ratio scale
    pub interest_rate_per_second: FixedPoint,
    #[serde(default)]
    pub max_borrow_amount: BorrowCapPolicy,
    /// Stored ceiling of legacy loans, used instead of `value × advance_rate`
    #[serde(default)]
    pub ceiling: Option<FixedPoint>,
    #[serde(default)]
    pub maturity_date: Option<DateTime<Utc>>,
}

impl InternalPricing {
    pub fn new(
        value: FixedPoint,
        advance_rate: FixedPoint,
        interest_rate_per_second: FixedPoint,
    ) -> Self {
        Self {
            value,
            advance_rate,
            interest_rate_per_second,
            max_borrow_amount: BorrowCapPolicy::default(),
            ceiling: None,
            maturity_date: None,
        }
    }

    pub fn with_policy(mut self, policy: BorrowCapPolicy) -> Self {
        self.max_borrow_amount = policy;
        self
    }

    pub fn with_legacy_ceiling(mut self, ceiling: FixedPoint) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub fn with_maturity(mut self, maturity_date: DateTime<Utc>) -> Self {
        self.maturity_date = Some(maturity_date);
        self
    }
}

/// Oracle-priced loan pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPricing {
    /// Current oracle price per unit
    pub oracle_value: FixedPoint,
    /// Units currently held
    pub outstanding_quantity: FixedPoint,
    /// Maximum units that may be financed; `None` means uncapped
    #[serde(default)]
    pub max_borrow_quantity: Option<FixedPoint>,
    /// Face value of one unit
    pub notional: FixedPoint,
    #[serde(default)]
    pub maturity_date: Option<DateTime<Utc>>,
    /// Oracle price identifier
    pub isin: String,
    /// Allowed relative deviation of a settlement price from the oracle
    #[serde(default)]
    pub max_price_variation: Option<FixedPoint>,
    pub interest_rate_per_second: FixedPoint,
}

impl ExternalPricing {
    pub fn new(
        isin: impl Into<String>,
        oracle_value: FixedPoint,
        outstanding_quantity: FixedPoint,
        notional: FixedPoint,
    ) -> Self {
        Self {
            oracle_value,
            outstanding_quantity,
            max_borrow_quantity: None,
            notional,
            maturity_date: None,
            isin: isin.into(),
            max_price_variation: None,
            interest_rate_per_second: FixedPoint::zero(RATIO_SCALE),
        }
    }

    pub fn with_max_quantity(mut self, max_borrow_quantity: FixedPoint) -> Self {
        self.max_borrow_quantity = Some(max_borrow_quantity);
        self
    }

    pub fn with_max_price_variation(mut self, variation: FixedPoint) -> Self {
        self.max_price_variation = Some(variation);
        self
    }

    pub fn with_maturity(mut self, maturity_date: DateTime<Utc>) -> Self {
        self.maturity_date = Some(maturity_date);
        self
    }
}

/// Pricing model of a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoanPricing {
    Internal(InternalPricing),
    External(ExternalPricing),
}

impl LoanPricing {
    pub fn kind(&self) -> &'static str {
        match self {
            LoanPricing::Internal(_) => "internal",
            LoanPricing::External(_) => "external",
        }
    }

    pub fn maturity_date(&self) -> Option<DateTime<Utc>> {
        match self {
            LoanPricing::Internal(pricing) => pricing.maturity_date,
            LoanPricing::External(pricing) => pricing.maturity_date,
        }
    }

    pub fn interest_rate_per_second(&self) -> &FixedPoint {
        match self {
            LoanPricing::Internal(pricing) => &pricing.interest_rate_per_second,
            LoanPricing::External(pricing) => &pricing.interest_rate_per_second,
        }
    }
}

/// Immutable loan snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub pool_id: PoolId,
    pub status: LoanStatus,
    pub pricing: LoanPricing,
    pub outstanding_principal: FixedPoint,
    pub outstanding_interest: FixedPoint,
    pub total_borrowed: FixedPoint,
    pub total_repaid: FixedPoint,
    /// Account that owns the loan NFT
    #[serde(default)]
    pub borrower: Option<AccountId>,
}

impl Loan {
    /// Create a loan with no debt history in a pool of the given decimals
    pub fn new(
        id: impl Into<LoanId>,
        pool_id: impl Into<PoolId>,
        pricing: LoanPricing,
        decimals: u32,
    ) -> Self {
        Self {
            id: id.into(),
            pool_id: pool_id.into(),
            status: LoanStatus::Created,
            pricing,
            outstanding_principal: FixedPoint::zero(decimals),
            outstanding_interest: FixedPoint::zero(decimals),
            total_borrowed: FixedPoint::zero(decimals),
            total_repaid: FixedPoint::zero(decimals),
            borrower: None,
        }
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = status;
        self
    }

    /// Set outstanding principal and interest
    pub fn with_debt(mut self, principal: FixedPoint, interest: FixedPoint) -> Self {
        self.outstanding_principal = principal;
        self.outstanding_interest = interest;
        self
    }

    pub fn with_total_borrowed(mut self, total_borrowed: FixedPoint) -> Self {
        self.total_borrowed = total_borrowed;
        self
    }

    pub fn with_borrower(mut self, borrower: AccountId) -> Self {
        self.borrower = Some(borrower);
        self
    }

    /// Principal plus interest
    pub fn outstanding_debt(&self, ctx: &DecimalContext) -> Result<FixedPoint, ArithmeticError> {
        self.outstanding_principal.add(&self.outstanding_interest, ctx)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn is_external(&self) -> bool {
        matches!(self.pricing, LoanPricing::External(_))
    }

    /// Whether the maturity date, if any, is at or before `now`
    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        match self.pricing.maturity_date() {
            Some(maturity) => maturity <= now,
            None => false,
        }
    }

    /// Face value of held units (`outstanding_quantity × notional`)
    pub fn current_face(
        &self,
        ctx: &DecimalContext,
    ) -> Result<Option<FixedPoint>, ArithmeticError> {
        match &self.pricing {
            LoanPricing::Internal(_) => Ok(None),
            LoanPricing::External(pricing) => pricing
                .outstanding_quantity
                .mul(&pricing.notional, self.outstanding_principal.scale(), ctx)
                .map(Some),
        }
    }

    /// Only an active loan without principal or interest may be closed
    pub fn can_close(&self) -> bool {
        self.is_active()
            && self.outstanding_principal.is_zero()
            && self.outstanding_interest.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn ctx() -> DecimalContext {
        DecimalContext::default()
    }

    fn external_loan() -> Loan {
        let ctx = ctx();
        let pricing = ExternalPricing::new(
            "US912828XG55",
            FixedPoint::price(dec!(1.02), &ctx),
            FixedPoint::quantity(dec!(500), &ctx),
            FixedPoint::currency(dec!(1), 18, &ctx),
        );
        Loan::new("7", "pool-1", LoanPricing::External(pricing), 18)
            .with_status(LoanStatus::Active)
            .with_debt(
                FixedPoint::currency(dec!(500), 18, &ctx),
                FixedPoint::currency(dec!(4.5), 18, &ctx),
            )
    }

    #[test]
    fn test_outstanding_debt_is_principal_plus_interest() {
        let loan = external_loan();
        assert_eq!(loan.outstanding_debt(&ctx()).unwrap().value(), dec!(504.5));
    }

    #[test]
    fn test_current_face() {
        let loan = external_loan();
        assert_eq!(loan.current_face(&ctx()).unwrap().unwrap().value(), dec!(500));
    }

    #[test]
    fn test_can_close_requires_zero_debt() {
        let loan = external_loan();
        assert!(!loan.can_close());

        let repaid = loan.with_debt(FixedPoint::zero(18), FixedPoint::zero(18));
        assert!(repaid.can_close());
        assert!(!repaid.with_status(LoanStatus::Created).can_close());
    }

    #[test]
    fn test_maturity() {
        let now = Utc::now();
        let mut loan = external_loan();
        assert!(!loan.is_matured(now));

        if let LoanPricing::External(pricing) = &mut loan.pricing {
            pricing.maturity_date = Some(now - Duration::days(1));
        }
        assert!(loan.is_matured(now));
    }

    #[test]
    fn test_pricing_serde_tag() {
        let loan = external_loan();
        let json = serde_json::to_value(&loan).unwrap();
        assert_eq!(json["pricing"]["kind"], "external");
        let parsed: Loan = serde_json::from_value(json).unwrap();
        assert!(parsed.is_external());
    }
}
