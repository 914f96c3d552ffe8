//! # Poolcalc Common
//!
//! Shared types, errors and configuration for the pool loan engine.
//!
//! ## Core Types
//!
//! - [`FixedPoint`]: decimal value held at a domain scale
//! - [`DecimalContext`]: precision and rounding passed into every operation
//! - [`Pool`], [`Loan`], [`PoolFee`], [`WalletBalance`]: read-only snapshots
//! - [`LoanOperation`]: payloads handed to the transaction collaborator
//!
//! ## Errors
//!
//! - [`EngineError`]: precondition failures and arithmetic faults
//! - [`ValidationErrors`]: field-scoped, user-correctable problems

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use config::EngineConfig;
pub use error::{ArithmeticError, EngineError, PreconditionError, Result};
pub use types::{
    context::{DecimalContext, RoundingMode},
    fee::{FeeAmounts, FeeId, FeeKind, PoolFee},
    fixed_point::{
        FixedPoint, CURRENCY_SCALE, ORACLE_PRICE_SCALE, PERCENT_SCALE, QUANTITY_SCALE,
        RATIO_SCALE,
    },
    loan::{
        BorrowCapPolicy, ExternalPricing, InternalPricing, Loan, LoanId, LoanPricing, LoanStatus,
    },
    operation::{LoanOperation, PrincipalLeg, RepayLeg},
    pool::{CurrencyMeta, Nav, Pool, PoolId, Reserve},
    rate::SECONDS_PER_YEAR,
    wallet::{AccountId, WalletBalance},
};
pub use validation::{FieldError, Validated, ValidationError, ValidationErrors};

/// Poolcalc version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
