//! Risk governance: per-trade sizing, tail-loss estimation and the
//! Black-Litterman posterior solver.
//! Everything here is a pure function of its arguments so it can be shared
//! by back-tests and live decision paths without coordination.

pub mod black_litterman;
pub mod sizing;
pub mod tails;
pub mod validation;

pub use black_litterman::{
    black_litterman_model, black_litterman_weights, implied_market_returns, sample_covariance,
    BlPosterior, MarketView,
};
pub use sizing::{
    apply_concentration_penalty, apply_rl_adjustment, cap_by_cvar, clamp_rl_multiplier,
    final_size_frac, meta_confidence_scale, regime_scale, tempered_kelly, uncertainty_penalty,
    SizingInputs, SizingResult,
};
pub use tails::estimate_cvar;
pub use validation::{cross_check, PortfolioValidator, UnavailableValidator, ValidationReport};
