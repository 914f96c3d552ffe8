//! Error types for the pool loan engine
//!
//! Two classes of failure exist:
//! - precondition failures and arithmetic faults, returned as [`EngineError`]
//! - user-correctable input problems, returned as values through
//!   [`crate::validation::ValidationErrors`]

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    // Fixed-point errors
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    // Caller misuse
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fixed-point arithmetic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Raw value {raw} is not representable at scale {scale}")]
    NotRepresentable { raw: i128, scale: u32 },

    #[error("Value carries {actual} fractional digits, more than its scale {scale}")]
    ExcessPrecision { actual: u32, scale: u32 },

    #[error("Scale {scale} exceeds the supported maximum {max}")]
    ScaleOutOfRange { scale: u32, max: u32 },
}

/// Programmer or caller misuse, never caused by user input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("No acting account available")]
    MissingAccount,

    #[error("No borrower context for loan {loan_id}")]
    MissingBorrower { loan_id: String },

    #[error("Selected fee at position {index} has no id")]
    MissingFeeId { index: usize },

    #[error("Fee {fee_id} has no charge amount")]
    MissingFeeAmount { fee_id: String },

    #[error("Fee {fee_id} is not configured for this pool")]
    UnknownFee { fee_id: String },

    #[error("Pricing mismatch: loan {loan_id} is {expected}, request is {actual}")]
    PricingMismatch {
        loan_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Loan {loan_id} does not belong to pool {pool_id}")]
    PoolMismatch { loan_id: String, pool_id: String },
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Precondition(PreconditionError::MissingFeeAmount {
            fee_id: "fee-7".to_string(),
        });
        assert!(err.to_string().contains("fee-7"));
    }

    #[test]
    fn test_arithmetic_error() {
        let err = ArithmeticError::NotRepresentable {
            raw: 42,
            scale: 27,
        };
        assert!(err.to_string().contains("scale 27"));
    }

    #[test]
    fn test_json_error_converts() {
        let err: EngineError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
