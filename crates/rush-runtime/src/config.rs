//! # Runtime Configuration
//!
//! Engine rules, telemetry and runtime knobs, overridable from `RUSH_*`
//! environment variables. Unparseable values are logged and ignored.

use rush_engine::EngineConfig;
use rush_telemetry::TelemetryConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Match engine rules and timeouts.
    pub engine: EngineConfig,
    /// Logging setup.
    pub telemetry: TelemetryConfig,
    /// Period of the completion sweeper.
    pub sweep_interval_ms: u64,
    /// Event bus channel capacity.
    pub bus_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            telemetry: TelemetryConfig::default(),
            sweep_interval_ms: 1_000,
            bus_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// - `RUSH_SWEEP_INTERVAL_MS`, `RUSH_BUS_CAPACITY`
    /// - `RUSH_START_COUNTDOWN_MS`, `RUSH_OPEN_TIMEOUT_MS`
    /// - `RUSH_MAX_CONFLICT_RETRIES`, `RUSH_RATING_CLAIM_TIMEOUT_MS`
    /// - `RUSH_MAX_MESSAGE_LEN`
    /// - telemetry variables, see [`TelemetryConfig::from_env`]
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.telemetry = TelemetryConfig::from_env();
        config
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let engine = &mut config.engine;

        override_from(&lookup, "RUSH_SWEEP_INTERVAL_MS", &mut config.sweep_interval_ms);
        override_from(&lookup, "RUSH_BUS_CAPACITY", &mut config.bus_capacity);
        override_from(&lookup, "RUSH_START_COUNTDOWN_MS", &mut engine.start_countdown_ms);
        override_from(&lookup, "RUSH_OPEN_TIMEOUT_MS", &mut engine.open_timeout_ms);
        override_from(&lookup, "RUSH_MAX_CONFLICT_RETRIES", &mut engine.max_conflict_retries);
        override_from(
            &lookup,
            "RUSH_RATING_CLAIM_TIMEOUT_MS",
            &mut engine.rating_claim_timeout_ms,
        );
        override_from(&lookup, "RUSH_MAX_MESSAGE_LEN", &mut engine.max_message_len);

        if config.sweep_interval_ms == 0 {
            warn!("RUSH_SWEEP_INTERVAL_MS must be positive, using default");
            config.sweep_interval_ms = Self::default().sweep_interval_ms;
        }
        if config.bus_capacity == 0 {
            warn!("RUSH_BUS_CAPACITY must be positive, using default");
            config.bus_capacity = Self::default().bus_capacity;
        }
        if config.engine.max_conflict_retries == 0 {
            warn!("RUSH_MAX_CONFLICT_RETRIES must be positive, using default");
            config.engine.max_conflict_retries = EngineConfig::default().max_conflict_retries;
        }
        config
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "Ignoring invalid configuration value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert_eq!(config.bus_capacity, 1000);
        assert_eq!(config.engine.start_countdown_ms, 10_000);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("RUSH_SWEEP_INTERVAL_MS", "250"),
            ("RUSH_START_COUNTDOWN_MS", " 3000 "),
            ("RUSH_MAX_MESSAGE_LEN", "80"),
        ]);
        assert_eq!(config.sweep_interval_ms, 250);
        assert_eq!(config.engine.start_countdown_ms, 3_000);
        assert_eq!(config.engine.max_message_len, 80);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = load(&[
            ("RUSH_OPEN_TIMEOUT_MS", "soon"),
            ("RUSH_SWEEP_INTERVAL_MS", "0"),
            ("RUSH_MAX_CONFLICT_RETRIES", "-1"),
        ]);
        let defaults = RuntimeConfig::default();
        assert_eq!(config.engine.open_timeout_ms, defaults.engine.open_timeout_ms);
        assert_eq!(config.sweep_interval_ms, defaults.sweep_interval_ms);
        assert_eq!(
            config.engine.max_conflict_retries,
            defaults.engine.max_conflict_retries
        );
    }
}
