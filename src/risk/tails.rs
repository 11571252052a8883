//! Tail-loss estimation for the CVaR cap.
//!
//! Peaks-over-threshold with a method-of-moments generalized Pareto fit.
//! Thin samples fall back to a fixed conservative estimate rather than
//! extrapolating from a handful of points.

use log::debug;
use statrs::statistics::Statistics;

use crate::config::TailConfig;

/// Smallest tail probability ratio fed to the GPD quantile.
const MIN_PROB_RATIO: f64 = 1e-6;

/// Linearly interpolated quantile of an ascending sample, placing `q` at
/// rank `(n - 1) * q`. `sorted` must be non-empty.
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Estimate the tail loss (fraction of equity) at `cfg.alpha` from a sample
/// of losses. Non-positive losses (gains) are ignored.
pub fn estimate_cvar(losses: &[f64], cfg: &TailConfig) -> f64 {
    let mut positive: Vec<f64> = losses.iter().copied().filter(|l| *l > 0.0 && l.is_finite()).collect();
    if positive.len() < cfg.min_samples {
        debug!(
            "only {} positive losses (< {}); using fallback CVaR {}",
            positive.len(),
            cfg.min_samples,
            cfg.fallback_cvar
        );
        return cfg.fallback_cvar;
    }

    positive.sort_by(f64::total_cmp);
    let thresh = linear_quantile(&positive, cfg.threshold_quantile);
    let excess: Vec<f64> = positive.iter().filter(|l| **l > thresh).map(|l| l - thresh).collect();
    if excess.len() < cfg.min_tail {
        return thresh.max(cfg.fallback_cvar);
    }

    let mean_excess = excess.iter().mean();
    let var_excess = excess.iter().population_variance();
    // method of moments needs a heavier-than-exponential tail
    if var_excess <= mean_excess * mean_excess {
        return thresh.max(cfg.fallback_cvar);
    }

    let xi = 0.5 * (1.0 - mean_excess * mean_excess / var_excess);
    let beta = mean_excess * (1.0 - xi);
    let p_tail = 1.0 - cfg.threshold_quantile;
    let prob = ((1.0 - cfg.alpha) / p_tail).max(MIN_PROB_RATIO);

    let var_alpha = if xi != 0.0 {
        thresh + (beta / xi) * (prob.powf(-xi) - 1.0)
    } else {
        thresh - beta * prob.ln()
    };
    debug!(
        "GPD fit: thresh={:.5} xi={:.4} beta={:.5} var_alpha={:.5}",
        thresh, xi, beta, var_alpha
    );

    var_alpha.max(thresh).max(cfg.cvar_floor)
}
