//! Governed per-trade sizing.
//!
//! A proposed trade is sized as a fraction of equity by a strict chain of
//! stages:
//!
//! ```text
//! tempered Kelly -> CVaR cap -> meta-confidence gate -> uncertainty
//!   -> regime -> RL multiplier -> concentration penalty
//! ```
//!
//! Every stage consumes only the previous stage's fraction plus its own
//! inputs. Missing or degenerate inputs never error; they collapse to a
//! conservative value. No stage after the CVaR cap may lift the fraction
//! above the CVaR-derived ceiling or `max_position_pct`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;

/// Scale applied when no meta-model probability is supplied.
const MISSING_META_SCALE: f64 = 0.5;
/// Below this probability the trade is vetoed outright.
const META_VETO_BELOW: f64 = 0.50;
/// Probabilities in [veto, full_ramp_from) get the distrust scale.
const META_DISTRUST_BELOW: f64 = 0.60;
const META_DISTRUST_SCALE: f64 = 0.25;
/// Ramp: (p - 0.40) / 0.40, reaching 1.0 at p = 0.80.
const META_RAMP_ORIGIN: f64 = 0.40;
const META_RAMP_WIDTH: f64 = 0.40;

const UNCERTAINTY_SLOPE: f64 = 0.6;
const UNCERTAINTY_FLOOR: f64 = 0.4;

const RL_MULT_MAX: f64 = 2.0;

const CONCENTRATION_INTERCEPT: f64 = 1.2;
const CONCENTRATION_SLOPE: f64 = 1.6;
const CONCENTRATION_FLOOR: f64 = 0.3;

/// Fraction of the CVaR budget allowed when the tail estimate is unknown.
const UNKNOWN_CVAR_BUDGET: f64 = 0.5;

/// Everything the pipeline needs for one candidate trade besides the config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingInputs {
    /// Expected excess return of the trade (fraction).
    pub expected_alpha: f64,
    /// Variance of the alpha estimate.
    pub alpha_var: f64,
    /// Tail loss (fraction of equity) of the position, if modelled.
    #[serde(default)]
    pub est_cvar: Option<f64>,
    /// Meta-model probability that the trade is favourable.
    #[serde(default)]
    pub meta_p: Option<f64>,
    /// Epistemic uncertainty reported alongside `meta_p`.
    #[serde(default)]
    pub meta_uncertainty: Option<f64>,
    /// Regime scalar, e.g. 1.0 normal, 0.5 volatile, 0.25 crash.
    #[serde(default = "unit_multiplier")]
    pub regime_risk_multiplier: f64,
    /// Advisory multiplier from the RL policy.
    #[serde(default = "unit_multiplier")]
    pub rl_sizing_mult: f64,
    /// Herfindahl index of current portfolio exposures.
    #[serde(default)]
    pub hhi: Option<f64>,
}

fn unit_multiplier() -> f64 {
    1.0
}

impl SizingInputs {
    /// Inputs with only an edge estimate; every optional signal absent and
    /// neutral regime / RL multipliers.
    pub fn new(expected_alpha: f64, alpha_var: f64) -> Self {
        Self {
            expected_alpha,
            alpha_var,
            est_cvar: None,
            meta_p: None,
            meta_uncertainty: None,
            regime_risk_multiplier: 1.0,
            rl_sizing_mult: 1.0,
            hhi: None,
        }
    }

    pub fn with_cvar(mut self, est_cvar: f64) -> Self {
        self.est_cvar = Some(est_cvar);
        self
    }

    pub fn with_meta(mut self, meta_p: f64, meta_uncertainty: Option<f64>) -> Self {
        self.meta_p = Some(meta_p);
        self.meta_uncertainty = meta_uncertainty;
        self
    }

    pub fn with_regime(mut self, multiplier: f64) -> Self {
        self.regime_risk_multiplier = multiplier;
        self
    }

    pub fn with_rl(mut self, multiplier: f64) -> Self {
        self.rl_sizing_mult = multiplier;
        self
    }

    pub fn with_hhi(mut self, hhi: f64) -> Self {
        self.hhi = Some(hhi);
        self
    }
}

/// Output of [`final_size_frac`]: the approved fraction plus the
/// intermediate fractions for audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Final approved fraction of equity.
    pub size_frac: f64,
    /// Tempered Kelly fraction after the absolute cap.
    pub base_kelly: f64,
    /// Fraction after the CVaR cap.
    pub cvar_limited: f64,
    /// Fraction after meta-confidence, uncertainty, regime and RL stages.
    pub post_meta_regime_rl: f64,
    /// Fraction after the concentration penalty.
    pub post_concentration: f64,
}

impl SizingResult {
    /// True when the pipeline approved nothing.
    pub fn is_vetoed(&self) -> bool {
        self.size_frac <= 0.0
    }

    /// Notional (in account currency) implied by `size_frac`.
    pub fn notional(&self, equity: f64) -> f64 {
        if equity > 0.0 {
            equity * self.size_frac
        } else {
            0.0
        }
    }

    /// Whole units affordable at `price` with the approved notional.
    pub fn units(&self, equity: f64, price: f64) -> u64 {
        if !(price > 0.0) {
            return 0;
        }
        let units = (self.notional(equity) / price).floor();
        if units.is_finite() && units > 0.0 {
            units as u64
        } else {
            0
        }
    }
}

/// Tempered Kelly fraction: `temper_factor * alpha / var`, clamped to
/// `[0, max_position_pct]`.
///
/// Returns exactly 0 when there is no positive, estimable edge.
pub fn tempered_kelly(expected_alpha: f64, alpha_var: f64, cfg: &SizingConfig) -> f64 {
    if !(alpha_var > 0.0) || !(expected_alpha > 0.0) {
        return 0.0;
    }
    let raw = cfg.temper_factor * (expected_alpha / alpha_var);
    raw.max(0.0).min(cfg.max_position_pct)
}

/// Limit the fraction so that `size_frac * est_cvar <= cvar_cap`.
///
/// An unknown (or non-positive) tail estimate gets half the CVaR budget.
pub fn cap_by_cvar(size_frac: f64, est_cvar: Option<f64>, cfg: &SizingConfig) -> f64 {
    let max_allowed = match est_cvar {
        | Some(cvar) if cvar > 0.0 => cfg.cvar_cap / cvar,
        | _ => {
            warn!(
                "CVaR estimate unavailable ({:?}); capping at {:.4}",
                est_cvar,
                cfg.cvar_cap * UNKNOWN_CVAR_BUDGET
            );
            cfg.cvar_cap * UNKNOWN_CVAR_BUDGET
        }
    };
    size_frac.max(0.0).min(max_allowed)
}

/// Multiplier produced by the meta-model trust gate.
///
/// The gate is deliberately discontinuous at 0.50 and 0.60.
pub fn meta_confidence_scale(meta_p: Option<f64>) -> f64 {
    match meta_p {
        | None => MISSING_META_SCALE,
        | Some(p) if !p.is_finite() => 0.0,
        | Some(p) if p < META_VETO_BELOW => 0.0,
        | Some(p) if p < META_DISTRUST_BELOW => META_DISTRUST_SCALE,
        | Some(p) => ((p - META_RAMP_ORIGIN) / META_RAMP_WIDTH).min(1.0),
    }
}

/// Attenuation for epistemic uncertainty; never below 0.4 and never above 1.
pub fn uncertainty_penalty(meta_uncertainty: Option<f64>) -> f64 {
    match meta_uncertainty {
        | None => 1.0,
        | Some(u) if u.is_nan() => UNCERTAINTY_FLOOR,
        | Some(u) => (1.0 - UNCERTAINTY_SLOPE * u.max(0.0)).max(UNCERTAINTY_FLOOR),
    }
}

/// Scale by the regime multiplier; negative or non-finite multipliers
/// become 0.
pub fn regime_scale(size_frac: f64, regime_risk_multiplier: f64) -> f64 {
    if !regime_risk_multiplier.is_finite() {
        return 0.0;
    }
    size_frac * regime_risk_multiplier.max(0.0)
}

/// Bound the RL advisory multiplier to `[0, 2]`.
pub fn clamp_rl_multiplier(rl_sizing_mult: f64) -> f64 {
    rl_sizing_mult.max(0.0).min(RL_MULT_MAX)
}

/// Apply the RL multiplier without breaching the CVaR or absolute caps.
pub fn apply_rl_adjustment(
    regime_scaled: f64, rl_sizing_mult: f64, cvar_limited: f64, cfg: &SizingConfig,
) -> f64 {
    let scaled = regime_scaled * clamp_rl_multiplier(rl_sizing_mult);
    // f64::min ignores NaN, which would hand back the whole cap
    if !scaled.is_finite() {
        return 0.0;
    }
    scaled.min(cvar_limited).min(cfg.max_position_pct)
}

/// Shrink the fraction for a concentrated book and apply the stricter
/// `max_after_concentration` ceiling.
///
/// `hhi == None` passes the fraction through untouched.
pub fn apply_concentration_penalty(size_frac: f64, hhi: Option<f64>, cfg: &SizingConfig) -> f64 {
    match hhi {
        | None => size_frac,
        | Some(h) => {
            let penalty = (CONCENTRATION_INTERCEPT - CONCENTRATION_SLOPE * h).max(CONCENTRATION_FLOOR);
            (size_frac * penalty).min(cfg.max_after_concentration)
        }
    }
}

/// Run the full sizing pipeline for one candidate trade.
pub fn final_size_frac(inputs: &SizingInputs, cfg: &SizingConfig) -> SizingResult {
    let base_kelly = tempered_kelly(inputs.expected_alpha, inputs.alpha_var, cfg);
    let cvar_limited = cap_by_cvar(base_kelly, inputs.est_cvar, cfg);

    if cvar_limited <= 0.0 {
        debug!("no risk budget: base_kelly={:.6} cvar_limited=0", base_kelly);
        return SizingResult { base_kelly, ..Default::default() };
    }

    let meta_scaled = cvar_limited * meta_confidence_scale(inputs.meta_p);
    let uncertainty_scaled = meta_scaled * uncertainty_penalty(inputs.meta_uncertainty);
    let regime_scaled = regime_scale(uncertainty_scaled, inputs.regime_risk_multiplier);
    let post_meta_regime_rl =
        apply_rl_adjustment(regime_scaled, inputs.rl_sizing_mult, cvar_limited, cfg);

    // The concentration penalty can exceed 1 for diversified books; the
    // earlier ceilings still hold.
    let post_concentration = apply_concentration_penalty(post_meta_regime_rl, inputs.hhi, cfg)
        .min(cvar_limited)
        .min(cfg.max_position_pct)
        .max(0.0);

    debug!(
        "sizing trail: kelly={:.6} cvar={:.6} meta={:.6} unc={:.6} regime={:.6} rl={:.6} conc={:.6}",
        base_kelly,
        cvar_limited,
        meta_scaled,
        uncertainty_scaled,
        regime_scaled,
        post_meta_regime_rl,
        post_concentration
    );

    SizingResult {
        size_frac: post_concentration,
        base_kelly,
        cvar_limited,
        post_meta_regime_rl,
        post_concentration,
    }
}
