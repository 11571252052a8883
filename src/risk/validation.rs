//! Optional third-party cross-check of Black-Litterman weights.
//!
//! An external optimizer can confirm the weights we derive, but the core
//! never depends on it: when no validator is wired in, the
//! [`UnavailableValidator`] reports itself as unavailable and nothing
//! changes.

use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::black_litterman::BlPosterior;

/// Outcome of an external validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Validator that produced the report.
    pub validator: String,
    /// Whether the external result agreed within its own tolerance.
    pub agrees: bool,
    /// Largest absolute weight difference observed.
    pub max_abs_diff: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Capability interface for an external portfolio-optimization backend.
#[cfg_attr(test, mockall::automock)]
pub trait PortfolioValidator: Send + Sync {
    fn name(&self) -> String;

    /// Whether the backend can be used right now.
    fn is_available(&self) -> bool;

    /// Compare `weights` against the backend's own solution for `posterior`.
    fn validate(&self, weights: &DVector<f64>, posterior: &BlPosterior) -> Option<ValidationReport>;
}

/// A no-op validator used when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableValidator;

impl PortfolioValidator for UnavailableValidator {
    fn name(&self) -> String {
        "unavailable".to_string()
    }

    fn is_available(&self) -> bool {
        false
    }

    fn validate(&self, _w: &DVector<f64>, _p: &BlPosterior) -> Option<ValidationReport> {
        None
    }
}

/// Run `validator` if it is available; never alters the inputs.
pub fn cross_check(
    validator: &dyn PortfolioValidator, weights: &DVector<f64>, posterior: &BlPosterior,
) -> Option<ValidationReport> {
    if !validator.is_available() {
        debug!("portfolio validator unavailable; skipping cross-check");
        return None;
    }
    let report = validator.validate(weights, posterior);
    if let Some(ref r) = report {
        debug!(
            "validator {} agrees={} max_abs_diff={:.3e}",
            r.validator, r.agrees, r.max_abs_diff
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn posterior() -> BlPosterior {
        BlPosterior {
            expected_returns: DVector::from_vec(vec![0.05, 0.07]),
            covariance: DMatrix::identity(2, 2) * 0.01,
            equilibrium_returns: DVector::from_vec(vec![0.04, 0.06]),
        }
    }

    #[test]
    fn unavailable_validator_is_a_no_op() {
        let w = DVector::from_vec(vec![0.5, 0.5]);
        assert!(cross_check(&UnavailableValidator, &w, &posterior()).is_none());
    }

    #[test]
    fn unavailable_backend_is_never_called() {
        let mut mock = MockPortfolioValidator::new();
        mock.expect_is_available().return_const(false);
        mock.expect_validate().never();

        let w = DVector::from_vec(vec![0.5, 0.5]);
        assert!(cross_check(&mock, &w, &posterior()).is_none());
    }

    #[test]
    fn available_backend_report_is_returned() {
        let mut mock = MockPortfolioValidator::new();
        mock.expect_is_available().return_const(true);
        mock.expect_validate()
            .withf(|w, p| w.len() == 2 && p.expected_returns.len() == 2)
            .times(1)
            .returning(|_, _| {
                Some(ValidationReport {
                    validator: "mock".to_string(),
                    agrees: true,
                    max_abs_diff: 1e-9,
                    notes: Vec::new(),
                })
            });

        let w = DVector::from_vec(vec![0.5, 0.5]);
        let report = cross_check(&mock, &w, &posterior()).unwrap();
        assert!(report.agrees);
        assert_eq!(report.validator, "mock");
    }
}
