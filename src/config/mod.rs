//! Configuration management for the DDoS traffic analyzer.
//!
//! This module handles loading and managing application configuration
//! from an optional configuration file and environment variables.

use std::env;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};

use crate::models::Config;

/// Load configuration from the config file and environment variables.
///
/// The file named by `CONFIG_FILE` (default `config/default.toml`) is
/// optional. Environment variables use the `ANALYZER_` prefix and `__`
/// between nested keys, e.g. `ANALYZER_ENGINE__WINDOW_SECONDS=30`.
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());

    let config = ConfigBuilder::builder()
        .set_default("engine.window_seconds", 60)?
        .set_default("engine.interval_seconds", 5)?
        .set_default("engine.retention_seconds", 300)?
        .set_default("engine.adapt_on_quiet_windows", true)?
        .set_default("engine.history_size", 60)?
        .set_default("engine.attack_expiry_seconds", 300)?
        .set_default("simulator.enabled", true)?
        .set_default("simulator.seed", 42)?
        .set_default("simulator.normal_rate", 100)?
        .set_default("simulator.scenario", "none")?
        .set_default("simulator.attack_interval_seconds", 30)?
        .add_source(File::with_name(&config_file).required(false))
        .add_source(
            Environment::with_prefix("ANALYZER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Baseline, Thresholds};

    #[test]
    fn test_defaults_without_file() {
        env::set_var("CONFIG_FILE", "does/not/exist.toml");
        let config = load_config().unwrap();

        assert_eq!(config.engine.window_seconds, 60);
        assert_eq!(config.engine.interval_seconds, 5);
        assert!(config.engine.adapt_on_quiet_windows);
        assert_eq!(config.engine.history_size, 60);
        assert_eq!(config.engine.attack_expiry_seconds, 300);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.baseline, Baseline::default());
        assert_eq!(config.simulator.scenario, "none");
    }
}
