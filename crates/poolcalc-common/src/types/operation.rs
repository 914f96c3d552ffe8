//! Operation payloads handed to the transaction collaborator
//!
//! These are opaque value objects; on-chain encoding happens elsewhere.

use serde::{Deserialize, Serialize};

use super::fee::FeeId;
use super::fixed_point::FixedPoint;
use super::loan::LoanId;
use super::pool::PoolId;

/// Principal movement in the loan's own pricing terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrincipalLeg {
    /// Currency amount of an internal loan
    Internal { amount: FixedPoint },
    /// Units of an external asset settled at `price`
    External {
        quantity: FixedPoint,
        price: FixedPoint,
    },
}

/// Repayment split into principal, interest and unscheduled parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepayLeg {
    pub principal: PrincipalLeg,
    pub interest: FixedPoint,
    pub unscheduled: FixedPoint,
}

/// Transaction payload produced by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanOperation {
    Borrow {
        pool_id: PoolId,
        loan_id: LoanId,
        amount: FixedPoint,
    },
    FinanceExternalLoan {
        pool_id: PoolId,
        loan_id: LoanId,
        quantity: FixedPoint,
        price: FixedPoint,
        /// Settlement amount, `price × quantity`
        amount: FixedPoint,
        isin: String,
    },
    Repay {
        pool_id: PoolId,
        loan_id: LoanId,
        repay: RepayLeg,
    },
    IncreaseDebt {
        pool_id: PoolId,
        loan_id: LoanId,
        principal: PrincipalLeg,
    },
    /// Interest and unscheduled parts are always zero for a correction
    DecreaseDebt {
        pool_id: PoolId,
        loan_id: LoanId,
        principal: PrincipalLeg,
        interest: FixedPoint,
        unscheduled: FixedPoint,
    },
    TransferLoanDebt {
        pool_id: PoolId,
        from_loan_id: LoanId,
        to_loan_id: LoanId,
        repay: RepayLeg,
        borrow: PrincipalLeg,
    },
    /// Drains `pending_fee` and adds `amount` in one call
    ChargePoolFee {
        pool_id: PoolId,
        fee_id: FeeId,
        amount: FixedPoint,
        pending_fee: FixedPoint,
    },
    CloseLoan {
        pool_id: PoolId,
        loan_id: LoanId,
    },
}

impl LoanOperation {
    /// Operation name as used by the transaction collaborator
    pub fn name(&self) -> &'static str {
        match self {
            LoanOperation::Borrow { .. } => "borrow",
            LoanOperation::FinanceExternalLoan { .. } => "financeExternalLoan",
            LoanOperation::Repay { .. } => "repay",
            LoanOperation::IncreaseDebt { .. } => "increaseDebt",
            LoanOperation::DecreaseDebt { .. } => "decreaseDebt",
            LoanOperation::TransferLoanDebt { .. } => "transferLoanDebt",
            LoanOperation::ChargePoolFee { .. } => "chargePoolFee",
            LoanOperation::CloseLoan { .. } => "closeLoan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::context::DecimalContext;
    use rust_decimal_macros::dec;

    #[test]
    fn test_operation_json_shape() {
        let ctx = DecimalContext::default();
        let op = LoanOperation::DecreaseDebt {
            pool_id: "pool-1".to_string(),
            loan_id: "4".to_string(),
            principal: PrincipalLeg::Internal {
                amount: FixedPoint::currency(dec!(25), 18, &ctx),
            },
            interest: FixedPoint::zero(18),
            unscheduled: FixedPoint::zero(18),
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "decrease_debt");
        assert_eq!(json["principal"]["kind"], "internal");
        assert_eq!(op.name(), "decreaseDebt");
    }
}
