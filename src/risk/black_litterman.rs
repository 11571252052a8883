//! Black-Litterman posterior returns.
//!
//! Blends market-implied equilibrium returns with investor views:
//!
//! * `pi   = delta * Sigma * w`
//! * `Omega = P (tau Sigma) P'`
//! * `Sigma_BL = [ (tau Sigma)^-1 + P' Omega^-1 P ]^-1`
//! * `E[R] = Sigma_BL [ (tau Sigma)^-1 pi + P' Omega^-1 Q ]`
//!
//! A singular `Omega` is ridge-regularized and retried; a singular
//! `tau * Sigma` is returned as [`Error::SingularPriorCovariance`].

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::BlackLittermanConfig;
use crate::utils::error::{Error, Result};

/// Attempts at growing the ridge before falling back to a pseudo-inverse.
const MAX_RIDGE_ATTEMPTS: usize = 8;

/// Inputs to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    /// Market-cap weights (length N). Need not sum to 1.
    pub weights: DVector<f64>,
    /// Asset covariance (N x N).
    pub covariance: DMatrix<f64>,
    /// View pick matrix (K x N).
    pub pick: DMatrix<f64>,
    /// View returns (length K).
    pub view_returns: DVector<f64>,
    /// Prior confidence scaling.
    pub tau: f64,
    /// Risk aversion (delta).
    pub risk_aversion: f64,
}

impl MarketView {
    pub fn new(
        weights: DVector<f64>, covariance: DMatrix<f64>, pick: DMatrix<f64>,
        view_returns: DVector<f64>, tau: f64, risk_aversion: f64,
    ) -> Self {
        Self { weights, covariance, pick, view_returns, tau, risk_aversion }
    }

    pub fn n_assets(&self) -> usize {
        self.weights.len()
    }

    pub fn n_views(&self) -> usize {
        self.view_returns.len()
    }

    /// Check that every shape lines up with N assets and K views.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_assets();
        let k = self.n_views();
        if n == 0 {
            return Err(Error::InvalidArgument("market view has no assets".to_string()));
        }
        if self.covariance.shape() != (n, n) {
            return Err(Error::DimensionMismatch(format!(
                "covariance is {:?}, expected ({n}, {n})",
                self.covariance.shape()
            )));
        }
        if k > 0 && self.pick.shape() != (k, n) {
            return Err(Error::DimensionMismatch(format!(
                "pick matrix is {:?}, expected ({k}, {n})",
                self.pick.shape()
            )));
        }
        if k == 0 && self.pick.nrows() != 0 {
            return Err(Error::DimensionMismatch(format!(
                "pick matrix has {} rows but no view returns were given",
                self.pick.nrows()
            )));
        }
        if !(self.tau > 0.0) {
            return Err(Error::InvalidArgument(format!("tau must be > 0, got {}", self.tau)));
        }
        Ok(())
    }
}

/// Posterior returned by [`black_litterman_model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlPosterior {
    /// Posterior expected returns `E[R]` (length N).
    pub expected_returns: DVector<f64>,
    /// Posterior covariance `Sigma_BL` (N x N), symmetric.
    pub covariance: DMatrix<f64>,
    /// Implied equilibrium returns `pi` the posterior was blended from.
    pub equilibrium_returns: DVector<f64>,
}

/// Implied equilibrium returns `pi = delta * Sigma * w`.
pub fn implied_market_returns(
    weights: &DVector<f64>, covariance: &DMatrix<f64>, risk_aversion: f64,
) -> Result<DVector<f64>> {
    let n = weights.len();
    if covariance.shape() != (n, n) {
        return Err(Error::DimensionMismatch(format!(
            "covariance is {:?} but there are {n} weights",
            covariance.shape()
        )));
    }
    Ok(covariance * weights * risk_aversion)
}

/// Sample covariance (ddof = 1) of a T x N return sample given as rows.
pub fn sample_covariance(asset_returns: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let t = asset_returns.len();
    if t < 2 {
        return Err(Error::InvalidArgument(format!(
            "need at least 2 observations for a covariance, got {t}"
        )));
    }
    let n = asset_returns[0].len();
    if n == 0 || asset_returns.iter().any(|row| row.len() != n) {
        return Err(Error::DimensionMismatch(
            "asset return sample is not a rectangular T x N matrix".to_string(),
        ));
    }

    let sample = DMatrix::from_fn(t, n, |i, j| asset_returns[i][j]);
    let means = sample.row_mean();
    let centered = DMatrix::from_fn(t, n, |i, j| sample[(i, j)] - means[j]);
    Ok(centered.transpose() * &centered / (t as f64 - 1.0))
}

/// Run the Bayesian update and return the posterior mean and covariance.
///
/// `regularization` is the relative ridge used when `Omega` is singular
/// (the ridge is `regularization * ||Omega||`).
pub fn black_litterman_model(view: &MarketView, regularization: f64) -> Result<BlPosterior> {
    view.validate()?;
    let n = view.n_assets();
    let k = view.n_views();

    let pi = implied_market_returns(&view.weights, &view.covariance, view.risk_aversion)?;
    let tau_sigma = &view.covariance * view.tau;
    let tau_sigma_inv = invert_finite(&tau_sigma).ok_or(Error::SingularPriorCovariance)?;

    if k == 0 {
        debug!("no views supplied; posterior equals the equilibrium prior");
        return Ok(BlPosterior {
            expected_returns: pi.clone(),
            covariance: symmetrize(&tau_sigma),
            equilibrium_returns: pi,
        });
    }

    let p = &view.pick;
    let pt = p.transpose();
    let omega = p * &tau_sigma * &pt;
    let omega_inv = invert_regularized(&omega, regularization);

    let pt_omega_inv = &pt * &omega_inv;
    let precision = &tau_sigma_inv + &pt_omega_inv * p;
    let sigma_bl = invert_finite(&precision).ok_or(Error::SingularPosteriorCovariance)?;
    let sigma_bl = symmetrize(&sigma_bl);

    let rhs = &tau_sigma_inv * &pi + &pt_omega_inv * &view.view_returns;
    let expected_returns = &sigma_bl * rhs;
    debug_assert_eq!(expected_returns.len(), n);

    Ok(BlPosterior { expected_returns, covariance: sigma_bl, equilibrium_returns: pi })
}

/// Unconstrained mean-variance weights from the posterior:
/// `w* = Sigma_BL^-1 (E[R] - r_f) / delta`.
///
/// The covariance is estimated from `asset_returns` (T rows of N returns).
/// When the sample has fewer than 2 assets, fewer than 2 observations or
/// ragged rows, the market weights are returned unchanged.
pub fn black_litterman_weights(
    asset_returns: &[Vec<f64>], market_weights: &DVector<f64>, views_p: &DMatrix<f64>,
    views_q: &DVector<f64>, cfg: &BlackLittermanConfig,
) -> Result<DVector<f64>> {
    let covariance = match degenerate_sample(asset_returns) {
        | Some(reason) => {
            debug!("black-litterman weights fall back to market weights: {reason}");
            return Ok(market_weights.clone());
        }
        | None => sample_covariance(asset_returns)?,
    };

    let view = MarketView::new(
        market_weights.clone(),
        covariance,
        views_p.clone(),
        views_q.clone(),
        cfg.tau,
        cfg.risk_aversion,
    );
    let posterior = black_litterman_model(&view, cfg.regularization)?;

    let precision =
        invert_finite(&posterior.covariance).ok_or(Error::SingularPosteriorCovariance)?;
    let excess = posterior.expected_returns.add_scalar(-cfg.risk_free_rate);
    Ok(precision * excess / cfg.risk_aversion)
}

fn degenerate_sample(asset_returns: &[Vec<f64>]) -> Option<&'static str> {
    let Some(first) = asset_returns.first() else {
        return Some("empty sample");
    };
    if asset_returns.len() < 2 {
        return Some("fewer than 2 observations");
    }
    if asset_returns.iter().any(|row| row.len() != first.len()) {
        return Some("sample is not two-dimensional");
    }
    if first.len() < 2 {
        return Some("fewer than 2 assets");
    }
    None
}

fn invert_finite(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    m.clone()
        .try_inverse()
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
}

/// Invert `m`, adding a growing ridge until it succeeds.
fn invert_regularized(m: &DMatrix<f64>, regularization: f64) -> DMatrix<f64> {
    if let Some(inv) = invert_finite(m) {
        return inv;
    }

    let k = m.nrows();
    let rel = if regularization > 0.0 { regularization } else { 1e-6 };
    let mut eps = rel * m.norm();
    if !(eps > 0.0) || !eps.is_finite() {
        // all-zero Omega has no scale to borrow
        eps = rel;
    }

    for attempt in 0..MAX_RIDGE_ATTEMPTS {
        let ridged = m + DMatrix::<f64>::identity(k, k) * eps;
        if let Some(inv) = invert_finite(&ridged) {
            debug!("view uncertainty regularized with eps={:.3e} (attempt {})", eps, attempt + 1);
            return inv;
        }
        eps *= 10.0;
    }

    debug!("ridge did not make Omega invertible; using pseudo-inverse");
    m.clone()
        .pseudo_inverse(rel)
        .unwrap_or_else(|_| DMatrix::zeros(k, k))
}

fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}
