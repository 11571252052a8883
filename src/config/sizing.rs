//! Sizing and solver parameter bundles for serde deserialization.
use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Parameters governing the per-trade sizing pipeline.
///
/// All fractions are expressed relative to account equity (0.10 = 10 %).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Kelly tempering factor, in (0, 0.5].
    #[serde(default = "default_temper_factor")]
    pub temper_factor: f64,
    /// Maximum fraction of equity that may be lost at the CVaR level.
    #[serde(default = "default_cvar_cap")]
    pub cvar_cap: f64,
    /// Absolute position cap per trade.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: f64,
    /// Ceiling applied after the concentration penalty.
    #[serde(default = "default_max_after_concentration")]
    pub max_after_concentration: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            temper_factor: default_temper_factor(),
            cvar_cap: default_cvar_cap(),
            max_position_pct: default_max_position_pct(),
            max_after_concentration: default_max_after_concentration(),
        }
    }
}

impl SizingConfig {
    /// Reject parameter bundles outside their documented ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.temper_factor > 0.0 && self.temper_factor <= 0.5) {
            return Err(Error::ConfigError(format!(
                "sizing.temper_factor must be in (0, 0.5], got {}",
                self.temper_factor
            )));
        }
        if !(self.cvar_cap > 0.0) {
            return Err(Error::ConfigError("sizing.cvar_cap must be > 0".to_string()));
        }
        if !(self.max_position_pct > 0.0) {
            return Err(Error::ConfigError("sizing.max_position_pct must be > 0".to_string()));
        }
        if !(self.max_after_concentration > 0.0) {
            return Err(Error::ConfigError(
                "sizing.max_after_concentration must be > 0".to_string(),
            ));
        }
        if self.max_after_concentration > self.max_position_pct {
            log::warn!(
                "sizing.max_after_concentration ({}) exceeds max_position_pct ({}); the absolute cap will bind first",
                self.max_after_concentration,
                self.max_position_pct
            );
        }
        Ok(())
    }
}

/// Black-Litterman solver defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackLittermanConfig {
    /// Prior confidence scaling (tau).
    #[serde(default = "default_tau")]
    pub tau: f64,
    /// Risk aversion coefficient (delta).
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: f64,
    /// Relative ridge added to a singular view-uncertainty matrix.
    #[serde(default = "default_regularization")]
    pub regularization: f64,
    /// Risk-free rate subtracted before deriving weights.
    #[serde(default)]
    pub risk_free_rate: f64,
}

impl Default for BlackLittermanConfig {
    fn default() -> Self {
        Self {
            tau: default_tau(),
            risk_aversion: default_risk_aversion(),
            regularization: default_regularization(),
            risk_free_rate: 0.0,
        }
    }
}

impl BlackLittermanConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tau > 0.0) {
            return Err(Error::ConfigError("black_litterman.tau must be > 0".to_string()));
        }
        if !(self.risk_aversion > 0.0) {
            return Err(Error::ConfigError(
                "black_litterman.risk_aversion must be > 0".to_string(),
            ));
        }
        if !(self.regularization > 0.0) {
            return Err(Error::ConfigError(
                "black_litterman.regularization must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Peaks-over-threshold tail estimator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailConfig {
    /// CVaR confidence level.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Quantile used as the peaks-over-threshold cut.
    #[serde(default = "default_threshold_quantile")]
    pub threshold_quantile: f64,
    /// Minimum count of positive losses before fitting.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Minimum count of exceedances before fitting.
    #[serde(default = "default_min_tail")]
    pub min_tail: usize,
    /// Returned when the sample is too thin to fit.
    #[serde(default = "default_fallback_cvar")]
    pub fallback_cvar: f64,
    /// Lower bound on any fitted estimate.
    #[serde(default = "default_cvar_floor")]
    pub cvar_floor: f64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            threshold_quantile: default_threshold_quantile(),
            min_samples: default_min_samples(),
            min_tail: default_min_tail(),
            fallback_cvar: default_fallback_cvar(),
            cvar_floor: default_cvar_floor(),
        }
    }
}

impl TailConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::ConfigError("tails.alpha must be in (0, 1)".to_string()));
        }
        if !(self.threshold_quantile > 0.0 && self.threshold_quantile < self.alpha) {
            return Err(Error::ConfigError(
                "tails.threshold_quantile must be in (0, alpha)".to_string(),
            ));
        }
        if self.fallback_cvar <= 0.0 || self.cvar_floor <= 0.0 {
            return Err(Error::ConfigError(
                "tails.fallback_cvar and tails.cvar_floor must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// --------- Helper default functions for serde ---------
fn default_temper_factor() -> f64 {
    0.25
}
fn default_cvar_cap() -> f64 {
    0.0125
}
fn default_max_position_pct() -> f64 {
    0.10
}
fn default_max_after_concentration() -> f64 {
    0.06
}
fn default_tau() -> f64 {
    0.05
}
fn default_risk_aversion() -> f64 {
    2.5
}
fn default_regularization() -> f64 {
    1e-6
}
fn default_alpha() -> f64 {
    0.99
}
fn default_threshold_quantile() -> f64 {
    0.95
}
fn default_min_samples() -> usize {
    50
}
fn default_min_tail() -> usize {
    10
}
fn default_fallback_cvar() -> f64 {
    0.02
}
fn default_cvar_floor() -> f64 {
    0.01
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_are_valid() {
        assert!(SizingConfig::default().validate().is_ok());
        assert!(BlackLittermanConfig::default().validate().is_ok());
        assert!(TailConfig::default().validate().is_ok());
    }

    #[test]
    fn temper_factor_range_enforced() {
        let cfg = SizingConfig { temper_factor: 0.75, ..Default::default() };
        assert_matches!(cfg.validate(), Err(Error::ConfigError(_)));

        let cfg = SizingConfig { temper_factor: 0.0, ..Default::default() };
        assert_matches!(cfg.validate(), Err(Error::ConfigError(_)));

        let cfg = SizingConfig { temper_factor: 0.5, ..Default::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn nan_caps_rejected() {
        let cfg = SizingConfig { cvar_cap: f64::NAN, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: SizingConfig = toml::from_str("cvar_cap = 0.02").unwrap();
        assert_eq!(cfg.cvar_cap, 0.02);
        assert_eq!(cfg.temper_factor, 0.25);
        assert_eq!(cfg.max_after_concentration, 0.06);
    }
}
