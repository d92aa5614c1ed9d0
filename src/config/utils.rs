use super::schemas::Config;
/// Configuration utilities - loading and access helpers
///
/// - Parsing configuration from TOML text or disk
/// - Installing it as the process-wide configuration
/// - Lock-scoped access helpers
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::Path;

use crate::errors::HubError;
use crate::logger::{ self, LogTag };

/// Global configuration instance, defaults until `load_config*` runs
pub static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/topichub.toml";

/// Parse and validate configuration text
pub fn parse_config(contents: &str) -> Result<Config, HubError> {
    let config = toml
        ::from_str::<Config>(contents)
        .map_err(|e| HubError::Config(format!("Failed to parse config: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Read a configuration file, falling back to defaults when it does not exist
pub fn read_config_file(path: &str) -> Result<Config, HubError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path)
        );
        return Ok(Config::default());
    }

    let contents = std::fs
        ::read_to_string(path)
        .map_err(|e| HubError::Config(format!("Failed to read config file '{}': {}", path, e)))?;

    parse_config(&contents)
}

/// Load configuration from the default path and install it globally
pub fn load_config() -> Result<(), HubError> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path and install it globally
pub fn load_config_from_path(path: &str) -> Result<(), HubError> {
    let config = read_config_file(path)?;
    *CONFIG.write() = config;
    logger::debug(LogTag::Config, &format!("Configuration loaded from '{}'", path));
    Ok(())
}

/// Run a closure against the current configuration
///
/// # Example
/// ```
/// let timeout = topichub::config::with_config(|cfg| cfg.connection.ack_timeout_ms);
/// assert!(timeout > 0);
/// ```
pub fn with_config<F, R>(f: F) -> R where F: FnOnce(&Config) -> R {
    let config = CONFIG.read();
    f(&config)
}

/// Get a clone of the entire configuration
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

fn validate_config(config: &Config) -> Result<(), HubError> {
    let reconnect = &config.reconnect;
    if !(0.0..=1.0).contains(&reconnect.jitter_ratio) {
        return Err(
            HubError::Config(
                format!("reconnect.jitter_ratio must be within 0.0..=1.0, got {}", reconnect.jitter_ratio)
            )
        );
    }
    if reconnect.multiplier < 1.0 {
        return Err(
            HubError::Config(
                format!("reconnect.multiplier must be >= 1.0, got {}", reconnect.multiplier)
            )
        );
    }
    if config.connection.max_pending_acks == 0 {
        return Err(HubError::Config("connection.max_pending_acks must be positive".to_string()));
    }
    Ok(())
}
