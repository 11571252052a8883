//! Utility functions and types for the risk core.

pub mod error;
mod logging;

pub use error::{Error, Result};
pub use logging::{
    filter_directives, init_logging, init_test_logging, resolve_filter, LOG_FILTER_ENV,
};

/// Re-export of commonly used types
pub mod prelude {
    pub use super::{
        error::{Error, Result},
        logging::init_logging,
    };
}
