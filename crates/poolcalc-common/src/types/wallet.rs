//! Wallet balance of the acting account

use std::fmt;

use serde::{Deserialize, Serialize};

use super::fixed_point::FixedPoint;

/// On-chain account address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spendable balance of one currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Currency symbol
    pub currency: String,
    pub amount: FixedPoint,
}

impl WalletBalance {
    pub fn new(currency: impl Into<String>, amount: FixedPoint) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}
