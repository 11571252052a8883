//! Logging setup for hosts embedding the risk core.
//!
//! The library itself only emits through the `log` macros. Sizing, tail
//! and Black-Litterman records all live under `oraclerisk::risk`, so the
//! default filter keeps other crates at `warn` and lets the caller choose
//! how loud the risk core is. The per-trade stage trail is logged at
//! `debug` by `oraclerisk::risk::sizing` and can be switched on alone.

use std::env;
use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Target};
use log::{info, LevelFilter};

use crate::utils::error::{Error, Result};

/// When set, replaces the computed filter verbatim (`env_logger` syntax).
pub const LOG_FILTER_ENV: &str = "ORACLE_LOG";

const CRATE_TARGET: &str = "oraclerisk";
const SIZING_TARGET: &str = "oraclerisk::risk::sizing";

/// Filter directives for the risk core at `level`, with dependencies at
/// `warn`. `sizing_trail` forces the sizing module to `debug`.
pub fn filter_directives(level: LevelFilter, sizing_trail: bool) -> String {
    let mut filter = format!("warn,{}={}", CRATE_TARGET, level.as_str().to_lowercase());
    if sizing_trail && level < LevelFilter::Debug {
        filter.push_str(&format!(",{}=debug", SIZING_TARGET));
    }
    filter
}

/// Resolve the filter to install: `ORACLE_LOG` if set, otherwise
/// [`filter_directives`] for the parsed `level`.
pub fn resolve_filter(level: &str, sizing_trail: bool) -> Result<String> {
    if let Ok(custom) = env::var(LOG_FILTER_ENV) {
        if !custom.trim().is_empty() {
            return Ok(custom);
        }
    }
    let level: LevelFilter = level
        .trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("Unknown log level '{}'", level)))?;
    Ok(filter_directives(level, sizing_trail))
}

/// Install a stderr logger for the risk core. A second call is a no-op.
pub fn init_logging(level: &str, sizing_trail: bool) -> Result<()> {
    let filter = resolve_filter(level, sizing_trail)?;

    let installed = Builder::new()
        .parse_filters(&filter)
        .format(|buf, record| {
            let target = record.target();
            let target = target.strip_prefix("oraclerisk::").unwrap_or(target);
            writeln!(
                buf,
                "{} {:5} {}: {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                target,
                record.args()
            )
        })
        .target(Target::Stderr)
        .try_init()
        .is_ok();

    if installed {
        info!("risk core logging: {}", filter);
    }
    Ok(())
}

/// Route records through the test harness capture at `debug`.
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_module(CRATE_TARGET, LevelFilter::Debug)
        .try_init();
}
