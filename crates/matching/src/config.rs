use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::index::DEFAULT_BYPASS_THRESHOLD;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Amount tolerance must be between 0 and 1, got {0}")]
    AmountTolerance(Decimal),
    #[error("Index bypass threshold must be at least 1")]
    BypassThreshold,
}

/// Tolerances for bank-to-book reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub date_tolerance_days: u32,
    /// Fraction of the bank amount, e.g. `0.01` for 1%.
    pub amount_tolerance: Decimal,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            date_tolerance_days: 3,
            amount_tolerance: Decimal::new(1, 2),
        }
    }
}

impl ReconcileSettings {
    pub fn new(date_tolerance_days: u32, amount_tolerance: Decimal) -> Self {
        Self {
            date_tolerance_days,
            amount_tolerance,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_fraction(self.amount_tolerance)
    }
}

/// Tolerances for duplicate screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    pub date_tolerance_days: u32,
    pub amount_tolerance: Decimal,
    /// History smaller than this is scanned in full instead of through the index.
    pub index_bypass_threshold: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            date_tolerance_days: 1,
            amount_tolerance: Decimal::new(1, 2),
            index_bypass_threshold: DEFAULT_BYPASS_THRESHOLD,
        }
    }
}

impl DedupSettings {
    pub fn new(date_tolerance_days: u32, amount_tolerance: Decimal) -> Self {
        Self {
            date_tolerance_days,
            amount_tolerance,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_fraction(self.amount_tolerance)?;
        if self.index_bypass_threshold == 0 {
            return Err(ConfigError::BypassThreshold);
        }
        Ok(())
    }
}

/// Top-level configuration file:
///
/// ```toml
/// [reconcile]
/// date_tolerance_days = 3
/// amount_tolerance = 0.01
///
/// [dedup]
/// date_tolerance_days = 1
/// amount_tolerance = 0.01
/// index_bypass_threshold = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub reconcile: ReconcileSettings,
    pub dedup: DedupSettings,
}

impl MatchConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reconcile.validate()?;
        self.dedup.validate()
    }
}

fn validate_fraction(value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::AmountTolerance(value));
    }
    Ok(())
}

/// Which side of a reconciliation a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Bank,
    Book,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bank => write!(f, "bank"),
            Side::Book => write!(f, "book"),
        }
    }
}

/// A configuration that runs but cannot produce meaningful matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfigWarning {
    /// Date and amount tolerance are both zero; only exact same-day,
    /// same-amount pairs can ever match.
    ZeroTolerance,
    /// One side has no matchable records while the other does.
    EmptyPool { side: Side },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::ZeroTolerance => {
                write!(f, "date and amount tolerance are both zero")
            }
            ConfigWarning::EmptyPool { side } => {
                write!(f, "no {side} transactions to match against")
            }
        }
    }
}
