//! Pool snapshot - currency, reserve and NAV as supplied by the chain query

use serde::{Deserialize, Serialize};

use super::fixed_point::FixedPoint;

pub type PoolId = String;

/// Pool currency metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMeta {
    /// Fractional digits of the currency on-chain
    pub decimals: u32,
    pub symbol: String,
}

impl CurrencyMeta {
    pub fn new(decimals: u32, symbol: impl Into<String>) -> Self {
        Self {
            decimals,
            symbol: symbol.into(),
        }
    }

    /// Scale of amounts denominated in this currency
    #[inline]
    pub fn scale(&self) -> u32 {
        self.decimals
    }
}

/// Liquidity held by the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reserve {
    /// Currency available for financing
    pub available: FixedPoint,
    /// Configured reserve maximum
    pub max: FixedPoint,
}

/// Net asset value figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nav {
    /// Assets under management, the base of fee caps
    pub aum: FixedPoint,
    /// AUM plus reserve
    pub total: FixedPoint,
}

/// Immutable pool snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub currency: CurrencyMeta,
    pub reserve: Reserve,
    pub nav: Nav,
}

impl Pool {
    /// Create a pool with an empty reserve and zero NAV
    pub fn new(id: impl Into<PoolId>, currency: CurrencyMeta) -> Self {
        let scale = currency.scale();
        Self {
            id: id.into(),
            currency,
            reserve: Reserve {
                available: FixedPoint::zero(scale),
                max: FixedPoint::zero(scale),
            },
            nav: Nav {
                aum: FixedPoint::zero(scale),
                total: FixedPoint::zero(scale),
            },
        }
    }

    /// Set available reserve
    pub fn with_reserve(mut self, available: FixedPoint) -> Self {
        self.reserve.available = available;
        self
    }

    /// Set assets under management
    pub fn with_aum(mut self, aum: FixedPoint) -> Self {
        self.nav.aum = aum;
        self
    }

    #[inline]
    pub fn currency_scale(&self) -> u32 {
        self.currency.scale()
    }
}
