//! Configuration module for the risk core

pub mod sizing;
mod template;

use crate::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub use sizing::{BlackLittermanConfig, SizingConfig, TailConfig};
pub use template::{generate_commented_config_template, generate_config_template};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// Per-trade sizing pipeline parameters
    #[serde(default)]
    pub sizing: SizingConfig,

    /// Black-Litterman solver parameters
    #[serde(default)]
    pub black_litterman: BlackLittermanConfig,

    /// Tail-loss estimator parameters
    #[serde(default)]
    pub tails: TailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            sizing: SizingConfig::default(),
            black_litterman: BlackLittermanConfig::default(),
            tails: TailConfig::default(),
        }
    }
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError(
                "Config version must be set (e.g., '0.1.0')".to_string(),
            ));
        }
        self.sizing.validate()?;
        self.black_litterman.validate()?;
        self.tails.validate()?;
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        if let Ok(config) = Self::from_file("oracle.toml") {
            return Ok(config);
        }

        if let Some(mut path) = dirs::config_dir() {
            path.push("oracle-risk");
            path.push("oracle.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Some(v) = env_f64("ORACLE_TEMPER_FACTOR")? {
            self.sizing.temper_factor = v;
        }
        if let Some(v) = env_f64("ORACLE_CVAR_CAP")? {
            self.sizing.cvar_cap = v;
        }
        if let Some(v) = env_f64("ORACLE_MAX_POS_PCT")? {
            self.sizing.max_position_pct = v;
        }
        if let Some(v) = env_f64("ORACLE_BL_TAU")? {
            self.black_litterman.tau = v;
        }
        if let Some(v) = env_f64("ORACLE_BL_RISK_AVERSION")? {
            self.black_litterman.risk_aversion = v;
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match env::var(key) {
        | Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| Error::ConfigError(format!("{} is not a number ({}): {}", key, raw, e))),
        | Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sizing.cvar_cap, 0.0125);
        assert_eq!(config.sizing.max_position_pct, 0.10);
        assert_eq!(config.black_litterman.regularization, 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_toml_parses_back() {
        let raw = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("oracle.toml");

        let mut config = Config::default();
        config.sizing.cvar_cap = 0.02;

        config.save(&config_path).unwrap();

        let loaded_config = temp_env::with_vars_unset(
            vec!["ORACLE_CVAR_CAP", "ORACLE_TEMPER_FACTOR", "ORACLE_MAX_POS_PCT"],
            || Config::from_file(&config_path).unwrap(),
        );
        assert_eq!(loaded_config.sizing.cvar_cap, 0.02);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let cfg: Config = toml::from_str("version = \"0.1.0\"\n[sizing]\ntemper_factor = 0.1\n").unwrap();
        assert_eq!(cfg.sizing.temper_factor, 0.1);
        assert_eq!(cfg.sizing.cvar_cap, 0.0125);
        assert_eq!(cfg.black_litterman, BlackLittermanConfig::default());
    }

    #[test]
    fn test_merge_env() {
        temp_env::with_vars(
            vec![("ORACLE_CVAR_CAP", Some("0.03")), ("ORACLE_BL_TAU", Some("0.025"))],
            || {
                let mut config = Config::default();
                config.merge_env().unwrap();

                assert_eq!(config.sizing.cvar_cap, 0.03);
                assert_eq!(config.black_litterman.tau, 0.025);
            },
        );
    }

    #[test]
    fn test_merge_env_rejects_garbage() {
        temp_env::with_var("ORACLE_MAX_POS_PCT", Some("ten percent"), || {
            let mut config = Config::default();
            assert_matches!(config.merge_env(), Err(Error::ConfigError(_)));
        });
    }

    #[test]
    fn test_validate_propagates_section_errors() {
        let mut config = Config::default();
        config.black_litterman.tau = 0.0;
        assert_matches!(config.validate(), Err(Error::ConfigError(_)));
    }
}
