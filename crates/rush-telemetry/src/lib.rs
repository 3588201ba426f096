//! # Rush Telemetry
//!
//! Logging bootstrap shared by every Puzzle-Rush binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rush_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUSH_SERVICE_NAME` | `puzzle-rush` | Service name attached to the startup log |
//! | `RUSH_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RUSH_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `RUSH_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for the process.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    config.validate()?;
    let tracing_guard = tracing_setup::init_tracing(config)?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for creating a span with match context.
///
/// ```rust,ignore
/// let _span = match_span!("submit", match_id = %id, player = %player);
/// ```
#[macro_export]
macro_rules! match_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
