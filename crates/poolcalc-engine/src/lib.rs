//! # Poolcalc Engine
//!
//! Loan calculations for a credit pool: how much a loan may still borrow,
//! how much a borrower may repay, and the operations that correct, transfer
//! and charge against loan debt.
//!
//! ## Debt With Margin
//!
//! ```text
//! APR    = (rate_per_second − 1) × 31_536_000
//! margin = debt × (1 + APR / (8760 / margin_hours))
//! ```
//!
//! A repay-all sized at the margin still covers interest accrued while the
//! transaction is pending.
//!
//! Every calculation is a pure function of its snapshot inputs. Validators
//! return field errors as values; caller bugs and values past the decimal
//! range surface as [`poolcalc_common::EngineError`].

pub mod correction;
pub mod fee_charge;
pub mod finance;
pub mod financing;
pub mod lifecycle;
pub mod repayment;
pub mod settlement;
pub mod transfer;

use chrono::{DateTime, Utc};
use poolcalc_common::{
    AccountId, DecimalContext, EngineConfig, FixedPoint, Loan, LoanOperation, Pool, PoolFee,
    Result, Validated, WalletBalance,
};

pub use correction::{CorrectionDelta, CorrectionTarget, DebtCorrectionEngine};
pub use fee_charge::{AcceptedCharge, FeeChargeRequest, FeeChargeValidator};
pub use finance::{FinancePlan, FinanceRequest, FinanceValidator};
pub use financing::{AvailableFinancing, AvailableFinancingCalculator};
pub use repayment::{RepayPlan, RepayRequest, RepaymentValidator};
pub use settlement::{QuantityDelta, SettlementCalculator};
pub use transfer::{DebtTransfer, DebtTransferCalculator};

/// Every calculator wired to one configuration
#[derive(Debug, Clone)]
pub struct LoanEngine {
    config: EngineConfig,
    ctx: DecimalContext,
    financing: AvailableFinancingCalculator,
    settlement: SettlementCalculator,
    correction: DebtCorrectionEngine,
    repayment: RepaymentValidator,
    fees: FeeChargeValidator,
    transfer: DebtTransferCalculator,
    finance: FinanceValidator,
}

impl LoanEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ctx = config.context();
        let financing = AvailableFinancingCalculator::from_config(&config);

        Self {
            ctx,
            settlement: SettlementCalculator::new(ctx),
            correction: DebtCorrectionEngine::new(ctx, financing.clone()),
            repayment: RepaymentValidator::new(ctx, financing.clone(), &config.external),
            fees: FeeChargeValidator::new(ctx),
            transfer: DebtTransferCalculator::new(ctx, financing.clone()),
            finance: FinanceValidator::new(ctx, financing.clone()),
            financing,
            config,
        }
    }

    /// Engine configured from `.env` and `POOLCALC__*` variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(EngineConfig::load()?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &DecimalContext {
        &self.ctx
    }

    pub fn financing(&self) -> &AvailableFinancingCalculator {
        &self.financing
    }

    pub fn settlement(&self) -> &SettlementCalculator {
        &self.settlement
    }

    pub fn correction(&self) -> &DebtCorrectionEngine {
        &self.correction
    }

    pub fn repayment(&self) -> &RepaymentValidator {
        &self.repayment
    }

    pub fn fees(&self) -> &FeeChargeValidator {
        &self.fees
    }

    pub fn transfer(&self) -> &DebtTransferCalculator {
        &self.transfer
    }

    pub fn finance(&self) -> &FinanceValidator {
        &self.finance
    }

    pub fn available_financing(&self, pool: &Pool, loan: &Loan) -> Result<AvailableFinancing> {
        self.financing.compute(pool, loan)
    }

    pub fn validate_finance(
        &self,
        pool: &Pool,
        loan: &Loan,
        request: &FinanceRequest,
        now: DateTime<Utc>,
    ) -> Result<Validated<FinancePlan>> {
        self.finance.validate(pool, loan, request, now)
    }

    pub fn validate_repay(
        &self,
        pool: &Pool,
        loan: &Loan,
        wallet: &WalletBalance,
        reserved_fees: &[FixedPoint],
        request: &RepayRequest,
    ) -> Result<Validated<RepayPlan>> {
        self.repayment
            .validate(pool, loan, wallet, reserved_fees, request)
    }

    pub fn repay_all(
        &self,
        pool: &Pool,
        loan: &Loan,
        wallet: &WalletBalance,
    ) -> Result<Validated<RepayPlan>> {
        self.repayment.repay_all_plan(pool, loan, wallet)
    }

    pub fn correct_debt(
        &self,
        pool: &Pool,
        loan: &Loan,
        target: &CorrectionTarget,
    ) -> Result<Validated<CorrectionDelta>> {
        self.correction.validate(pool, loan, target)
    }

    pub fn transfer_debt(
        &self,
        source_pool: &Pool,
        source_loan: &Loan,
        target_loan: &Loan,
        finance_amount: &FixedPoint,
    ) -> Result<Validated<DebtTransfer>> {
        self.transfer
            .validate(source_pool, source_loan, target_loan, finance_amount)
    }

    pub fn charge_fees(
        &self,
        pool: &Pool,
        fees: &[PoolFee],
        requests: &[FeeChargeRequest],
        acting_account: Option<&AccountId>,
    ) -> Result<Validated<Vec<LoanOperation>>> {
        self.fees
            .build_charge_batch(pool, fees, requests, acting_account)
    }

    pub fn close_loan(&self, loan: &Loan) -> Result<Validated<LoanOperation>> {
        lifecycle::close_operation(loan, &self.ctx)
    }
}

impl Default for LoanEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
