//! Field-scoped validation errors
//!
//! User-correctable problems are returned as values keyed by the form field
//! they belong to. They never travel through [`crate::EngineError`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::fixed_point::FixedPoint;

/// Result of a validation: the accepted plan or every field error found
pub type Validated<T> = std::result::Result<T, ValidationErrors>;

/// A single user-correctable problem
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Value is required")]
    Required,

    #[error("Value must be positive")]
    NotPositive,

    #[error("Value must not be negative")]
    Negative,

    #[error("Amount exceeds available financing ({max})")]
    ExceedsAvailableFinancing { max: FixedPoint },

    #[error("Amount exceeds pool reserve ({max})")]
    ExceedsReserve { max: FixedPoint },

    #[error("Amount exceeds outstanding debt ({max})")]
    ExceedsOutstanding { max: FixedPoint },

    #[error("Amount exceeds max repayable ({max})")]
    ExceedsMaxRepayable { max: FixedPoint },

    #[error("Amount exceeds fee cap ({max})")]
    ExceedsFeeCap { max: FixedPoint },

    #[error("Price {price} is outside the allowed range {min} - {max}")]
    PriceOutsideVariance {
        price: FixedPoint,
        min: FixedPoint,
        max: FixedPoint,
    },

    #[error("Loan is not active")]
    LoanNotActive,

    #[error("Loan is closed")]
    LoanClosed,

    #[error("Maturity date has passed")]
    MaturityPassed,

    #[error("Outstanding debt must be repaid first ({outstanding})")]
    DebtOutstanding { outstanding: FixedPoint },

    #[error("Fee is not configured for this pool")]
    UnknownFee,

    #[error("Fee accrues automatically and cannot be charged")]
    FeeNotChargeable,

    #[error("Loan has no oracle price")]
    OraclePriceMissing,

    #[error("Wallet balance {available} does not cover {required}")]
    InsufficientBalance {
        required: FixedPoint,
        available: FixedPoint,
    },

    #[error("Source and target loan must differ")]
    SameLoan,
}

/// Validation error bound to a form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: ValidationError,
}

/// Collected field errors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, error: ValidationError) {
        self.0.push(FieldError {
            field: field.into(),
            error,
        });
    }

    /// Record `error` for `field` unless `ok` holds
    pub fn ensure(&mut self, ok: bool, field: impl Into<String>, error: ValidationError) {
        if !ok {
            self.push(field, error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First error recorded for `field`
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| &entry.error)
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Merge another set, prefixing its fields (`fees[2].amount`)
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for entry in other.0 {
            self.push(format!("{}.{}", prefix, entry.field), entry.error);
        }
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Validated<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", entry.field, entry.error)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
