//! Engine configuration
//!
//! Defaults match production behavior. `EngineConfig::load` overlays a `.env`
//! file and `POOLCALC__*` environment variables, with `__` separating nested
//! keys (`POOLCALC__MARGIN__REPAY_MARGIN_HOURS=3`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::context::{DecimalContext, RoundingMode};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "POOLCALC";

/// Hours in a 365-day year
const HOURS_PER_YEAR: u32 = 365 * 24;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed-point precision and rounding
    pub decimal: DecimalSettings,
    /// Repay-all interest buffer
    pub margin: MarginSettings,
    /// Oracle-priced loan policy
    pub external: ExternalSettings,
}

impl EngineConfig {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        debug!(?cfg, "Loaded engine configuration");
        Ok(cfg)
    }

    /// Reject settings the calculators cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.decimal.precision == 0 {
            return Err(EngineError::Config(
                "decimal.precision must be positive".to_string(),
            ));
        }
        if self.margin.repay_margin_hours == 0 {
            return Err(EngineError::Config(
                "margin.repay_margin_hours must be positive".to_string(),
            ));
        }
        if self.external.default_max_price_variation < Decimal::ZERO {
            return Err(EngineError::Config(
                "external.default_max_price_variation must not be negative".to_string(),
            ));
        }
        if self.external.unbounded_quantity_cap <= Decimal::ZERO {
            return Err(EngineError::Config(
                "external.unbounded_quantity_cap must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Decimal context for every calculation
    pub fn context(&self) -> DecimalContext {
        self.decimal.context()
    }
}

/// Fixed-point settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimalSettings {
    /// Significant digits retained by each operation
    pub precision: u32,
    pub rounding: RoundingMode,
}

impl DecimalSettings {
    pub fn context(&self) -> DecimalContext {
        DecimalContext::new(self.precision, self.rounding)
    }
}

impl Default for DecimalSettings {
    fn default() -> Self {
        Self {
            precision: DecimalContext::DEFAULT_PRECISION,
            rounding: RoundingMode::HalfCeil,
        }
    }
}

/// Repay-all buffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginSettings {
    /// Hours of extra interest added to outstanding debt so a repay-all
    /// transaction still covers the debt when it lands on-chain
    pub repay_margin_hours: u32,
}

impl MarginSettings {
    /// Number of margin windows in a year (2920 for a 3-hour margin)
    pub fn periods_per_year(&self) -> Decimal {
        Decimal::from(HOURS_PER_YEAR) / Decimal::from(self.repay_margin_hours.max(1))
    }
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self {
            repay_margin_hours: 3,
        }
    }
}

/// External (oracle-priced) loan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSettings {
    /// Borrow cap, in units, for loans without a max borrow quantity
    pub unbounded_quantity_cap: Decimal,
    /// Relative settlement price deviation allowed when a loan sets none
    pub default_max_price_variation: Decimal,
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            unbounded_quantity_cap: Decimal::from(100_000_000u64),
            default_max_price_variation: Decimal::new(5, 2),
        }
    }
}
