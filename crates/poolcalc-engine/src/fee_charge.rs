//! Pool fee charges
//!
//! A variable fee may be charged up to `percent_of_nav × nav.aum`; fixed fees
//! accrue on their own and are never charged by hand. A batch of accepted
//! charges becomes one `chargePoolFee` operation per fee, each draining the
//! fee's pending amount.

use poolcalc_common::{
    AccountId, DecimalContext, FeeId, FixedPoint, LoanOperation, Pool, PoolFee, PreconditionError,
    Result, Validated, ValidationError, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// One row of the fee charge form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeChargeRequest {
    pub fee_id: Option<FeeId>,
    pub amount: Option<FixedPoint>,
}

impl FeeChargeRequest {
    pub fn new(fee_id: impl Into<FeeId>, amount: FixedPoint) -> Self {
        Self {
            fee_id: Some(fee_id.into()),
            amount: Some(amount),
        }
    }
}

/// A charge that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedCharge {
    pub fee_id: FeeId,
    pub amount: FixedPoint,
    /// Pending amount drained by the same call
    pub pending_fee: FixedPoint,
    pub max_charge: FixedPoint,
}

#[derive(Debug, Clone)]
pub struct FeeChargeValidator {
    ctx: DecimalContext,
}

impl FeeChargeValidator {
    pub fn new(ctx: DecimalContext) -> Self {
        Self { ctx }
    }

    /// `percent_of_nav × nav.aum`
    pub fn max_charge(&self, pool: &Pool, fee: &PoolFee) -> Result<FixedPoint> {
        Ok(fee.max_charge(&pool.nav.aum, &self.ctx)?)
    }

    /// Check every row; field names are `fees[i].amount` and `fees[i].fee_id`
    #[instrument(skip_all, fields(pool_id = %pool.id, requests = requests.len()))]
    pub fn validate(
        &self,
        pool: &Pool,
        fees: &[PoolFee],
        requests: &[FeeChargeRequest],
    ) -> Result<Validated<Vec<AcceptedCharge>>> {
        let mut errors = ValidationErrors::new();
        let mut accepted = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let mut row = ValidationErrors::new();
            let fee = request
                .fee_id
                .as_deref()
                .and_then(|id| find_fee(fees, id));

            match (&request.fee_id, fee) {
                (None, _) => row.push("fee_id", ValidationError::Required),
                (Some(_), None) => row.push("fee_id", ValidationError::UnknownFee),
                (Some(_), Some(fee)) => {
                    row.ensure(
                        fee.is_chargeable(),
                        "fee_id",
                        ValidationError::FeeNotChargeable,
                    );
                }
            }

            let max_charge = fee.map(|fee| self.max_charge(pool, fee)).transpose()?;
            match (&request.amount, max_charge) {
                (None, _) => row.push("amount", ValidationError::Required),
                (Some(amount), _) if !amount.is_positive() => {
                    row.push("amount", ValidationError::NotPositive)
                }
                (Some(amount), Some(max)) if *amount > max => {
                    row.push("amount", ValidationError::ExceedsFeeCap { max })
                }
                (Some(_), _) => {}
            }

            if row.is_empty() {
                if let (Some(fee_id), Some(amount), Some(fee), Some(max_charge)) =
                    (&request.fee_id, request.amount, fee, max_charge)
                {
                    accepted.push(AcceptedCharge {
                        fee_id: fee_id.clone(),
                        amount,
                        pending_fee: fee.amounts.pending,
                        max_charge,
                    });
                }
            }
            errors.extend_prefixed(&format!("fees[{}]", index), row);
        }

        if errors.is_empty() {
            debug!(accepted = accepted.len(), "Fee charges accepted");
        } else {
            warn!(%errors, "Fee charges rejected");
        }
        Ok(errors.into_result(accepted))
    }

    /// Build the `chargePoolFee` batch.
    ///
    /// A missing acting account, fee id or amount is a caller bug and fails
    /// hard; amounts above the fee cap come back as field errors.
    #[instrument(skip_all, fields(pool_id = %pool.id, requests = requests.len()))]
    pub fn build_charge_batch(
        &self,
        pool: &Pool,
        fees: &[PoolFee],
        requests: &[FeeChargeRequest],
        acting_account: Option<&AccountId>,
    ) -> Result<Validated<Vec<LoanOperation>>> {
        let account = acting_account.ok_or(PreconditionError::MissingAccount)?;

        for (index, request) in requests.iter().enumerate() {
            let fee_id = request
                .fee_id
                .as_deref()
                .ok_or(PreconditionError::MissingFeeId { index })?;
            if request.amount.is_none() {
                return Err(PreconditionError::MissingFeeAmount {
                    fee_id: fee_id.to_string(),
                }
                .into());
            }
            if find_fee(fees, fee_id).is_none() {
                return Err(PreconditionError::UnknownFee {
                    fee_id: fee_id.to_string(),
                }
                .into());
            }
        }

        let batch = self.validate(pool, fees, requests)?.map(|accepted| {
            accepted
                .into_iter()
                .map(|charge| LoanOperation::ChargePoolFee {
                    pool_id: pool.id.clone(),
                    fee_id: charge.fee_id,
                    amount: charge.amount,
                    pending_fee: charge.pending_fee,
                })
                .collect::<Vec<_>>()
        });

        if let Ok(operations) = &batch {
            debug!(%account, operations = operations.len(), "Built fee charge batch");
        }
        Ok(batch)
    }
}

fn find_fee<'a>(fees: &'a [PoolFee], fee_id: &str) -> Option<&'a PoolFee> {
    fees.iter().find(|fee| fee.id.as_deref() == Some(fee_id))
}
