//! # Oracle risk core
//! Governed position sizing and Black-Litterman posterior returns.
//!
//! * [`risk::sizing`] turns an edge estimate plus model, regime, RL and
//!   concentration signals into a capped fraction of equity.
//! * [`risk::black_litterman`] blends equilibrium returns with investor views.
//! * [`risk::tails`] estimates the tail loss fed to the CVaR cap.
//! * [`portfolio`] measures book concentration (HHI).
//!
//! Every computation is a pure function of explicit inputs; configuration is
//! passed by value and never held in process-wide state.

pub use crate::utils::error::{Error, Result};

pub mod config;
pub mod portfolio;
pub mod risk;
pub mod utils;

pub use config::{BlackLittermanConfig, Config, SizingConfig, TailConfig};
pub use risk::{final_size_frac, SizingInputs, SizingResult};
