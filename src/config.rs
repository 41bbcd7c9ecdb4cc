//! Engine configuration.
//!
//! All settings have defaults; a TOML file only needs the keys it changes:
//!
//! ```toml
//! amount_tolerance = "0.01"
//! date_window_days = 7
//! amount_mismatch_tolerance = "0.01"
//! min_selection = 2
//! max_selection = 10
//! ```

use crate::comparison::StatusResolver;
use crate::error::{ReconError, Result};
use crate::money::Money;
use chrono::Duration;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    /// Maximum amount delta for two records to be paired.
    pub amount_tolerance: Money,

    /// Maximum absolute distance, in days, between paired timestamps.
    pub date_window_days: u32,

    /// Amount delta above which a pair is flagged as a mismatch.
    /// Independent of `amount_tolerance`.
    pub amount_mismatch_tolerance: Money,

    pub min_selection: usize,

    pub max_selection: usize,
}

impl Default for ReconConfig {
    fn default() -> Self {
        ReconConfig {
            amount_tolerance: Money::CENT,
            date_window_days: 7,
            amount_mismatch_tolerance: Money::CENT,
            min_selection: 2,
            max_selection: 10,
        }
    }
}

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount_tolerance.is_negative() {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance must not be negative, got {}",
                self.amount_tolerance
            )));
        }
        if self.amount_mismatch_tolerance.is_negative() {
            return Err(ReconError::ConfigValidation(format!(
                "amount_mismatch_tolerance must not be negative, got {}",
                self.amount_mismatch_tolerance
            )));
        }
        if self.min_selection < 2 {
            return Err(ReconError::ConfigValidation(format!(
                "min_selection must be at least 2, got {}",
                self.min_selection
            )));
        }
        if self.max_selection < self.min_selection {
            return Err(ReconError::ConfigValidation(format!(
                "max_selection ({}) must not be below min_selection ({})",
                self.max_selection, self.min_selection
            )));
        }
        Ok(())
    }

    pub fn date_window(&self) -> Duration {
        Duration::days(i64::from(self.date_window_days))
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            amount: self.amount_tolerance,
            date_window: self.date_window(),
        }
    }

    pub fn status_resolver(&self) -> StatusResolver {
        StatusResolver::new(self.amount_mismatch_tolerance)
    }
}

/// Matching window, fixed for the duration of one matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    pub amount: Money,
    pub date_window: Duration,
}

impl Default for Tolerance {
    fn default() -> Self {
        ReconConfig::default().tolerance()
    }
}
