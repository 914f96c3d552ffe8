//! Loan closing

use poolcalc_common::{
    DecimalContext, Loan, LoanOperation, LoanStatus, Result, Validated, ValidationError,
    ValidationErrors,
};
use tracing::warn;

/// `closeLoan` for an active loan without debt
pub fn close_operation(loan: &Loan, ctx: &DecimalContext) -> Result<Validated<LoanOperation>> {
    let mut errors = ValidationErrors::new();

    match loan.status {
        LoanStatus::Closed => errors.push("loan", ValidationError::LoanClosed),
        LoanStatus::Created => errors.push("loan", ValidationError::LoanNotActive),
        LoanStatus::Active if !loan.can_close() => {
            let outstanding = loan.outstanding_debt(ctx)?;
            errors.push("loan", ValidationError::DebtOutstanding { outstanding });
        }
        LoanStatus::Active => {}
    }

    if !errors.is_empty() {
        warn!(loan_id = %loan.id, %errors, "Close rejected");
    }
    Ok(errors.into_result(LoanOperation::CloseLoan {
        pool_id: loan.pool_id.clone(),
        loan_id: loan.id.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolcalc_common::{FixedPoint, InternalPricing, LoanPricing};
    use rust_decimal_macros::dec;

    fn loan(status: LoanStatus) -> Loan {
        let ctx = DecimalContext::default();
        let pricing = InternalPricing::new(
            FixedPoint::currency(dec!(100), 18, &ctx),
            FixedPoint::ratio(dec!(0.5), &ctx),
            FixedPoint::zero(27),
        );
        Loan::new("3", "pool-1", LoanPricing::Internal(pricing), 18).with_status(status)
    }

    #[test]
    fn test_close_repaid_loan() {
        let ctx = DecimalContext::default();
        let loan = loan(LoanStatus::Active);
        assert!(loan.can_close());
        assert_eq!(
            close_operation(&loan, &ctx).unwrap().unwrap().name(),
            "closeLoan"
        );
    }

    #[test]
    fn test_close_with_debt_rejected() {
        let ctx = DecimalContext::default();
        let loan = loan(LoanStatus::Active).with_debt(
            FixedPoint::currency(dec!(1), 18, &ctx),
            FixedPoint::zero(18),
        );
        let errors = close_operation(&loan, &ctx).unwrap().unwrap_err();
        assert!(matches!(
            errors.get("loan"),
            Some(ValidationError::DebtOutstanding { .. })
        ));
    }

    #[test]
    fn test_close_requires_active() {
        let ctx = DecimalContext::default();
        let errors = close_operation(&loan(LoanStatus::Created), &ctx)
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("loan"), Some(&ValidationError::LoanNotActive));

        let errors = close_operation(&loan(LoanStatus::Closed), &ctx)
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("loan"), Some(&ValidationError::LoanClosed));
    }
}
