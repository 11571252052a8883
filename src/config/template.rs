//! Configuration template generation

use crate::config::Config;
use crate::utils::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Generate a default configuration file at the specified path
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = Config::default();
    config
        .save(path)
        .map_err(|e| Error::ConfigError(e.to_string()))
}

/// Generate a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let toml_str = r#"# Oracle risk core configuration
# All fractions are relative to account equity (0.10 = 10%).

version = "0.1.0"

[sizing]
# Kelly tempering factor, in (0, 0.5]
temper_factor = 0.25

# Maximum fraction of equity that may be lost at the CVaR level
cvar_cap = 0.0125

# Absolute position cap per trade
max_position_pct = 0.10

# Ceiling applied after the concentration penalty
max_after_concentration = 0.06

[black_litterman]
# Prior confidence scaling (tau)
tau = 0.05

# Risk aversion coefficient (delta)
risk_aversion = 2.5

# Relative ridge added when the view-uncertainty matrix is singular
regularization = 1e-6

# Annualised risk-free rate subtracted before deriving weights
risk_free_rate = 0.0

[tails]
# CVaR confidence level
alpha = 0.99

# Peaks-over-threshold cut
threshold_quantile = 0.95

# Minimum positive losses / exceedances before fitting
min_samples = 50
min_tail = 10

# Returned when the sample is too thin; lower bound for any fit
fallback_cvar = 0.02
cvar_floor = 0.01
"#;

    fs::write(path, toml_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commented_template_matches_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oracle.toml");
        generate_commented_config_template(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn plain_template_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oracle.toml");
        generate_config_template(&path).unwrap();
        assert!(path.exists());
    }
}
