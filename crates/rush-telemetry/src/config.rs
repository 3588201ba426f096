//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;

/// Accepted values for `log_level` when it is a bare level.
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log
    pub service_name: String,

    /// Log level filter (a bare level or a full `EnvFilter` directive)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "puzzle-rush".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RUSH_SERVICE_NAME`: Service name (default: puzzle-rush)
    /// - `RUSH_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RUSH_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RUSH_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("RUSH_SERVICE_NAME")
                .unwrap_or_else(|_| "puzzle-rush".to_string()),

            log_level: env::var("RUSH_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("RUSH_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("RUSH_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Reject obviously broken settings before touching global state.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.service_name.trim().is_empty() {
            return Err(TelemetryError::Config("service name is empty".into()));
        }
        let bare = !self.log_level.contains('=') && !self.log_level.contains(',');
        if bare && !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(TelemetryError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "puzzle-rush");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let config = TelemetryConfig {
            log_level: "loud".into(),
            ..TelemetryConfig::default()
        };
        assert!(matches!(config.validate(), Err(TelemetryError::Config(_))));
    }

    #[test]
    fn test_validate_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "rush_engine=debug,info".into(),
            ..TelemetryConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
