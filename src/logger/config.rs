/// Logger configuration derived from command-line flags
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{ get_cmd_args, has_arg };

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,

    /// Tags allowed to log (empty = all)
    pub enabled_tags: HashSet<String>,

    /// Tags with --debug-<tag>
    pub debug_tags: HashSet<String>,

    /// Tags with --verbose-<tag>
    pub verbose_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            enabled_tags: HashSet::new(),
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> = Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Scan command-line arguments for --debug-<tag>, --verbose[-<tag>] and --quiet
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    for arg in get_cmd_args() {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
        } else if let Some(key) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(key.to_string());
            config.debug_tags.insert(key.to_string());
        }
    }

    if has_arg("--verbose") {
        config.min_level = LogLevel::Verbose;
        for tag in LogTag::all() {
            config.debug_tags.insert(tag.to_debug_key());
        }
    } else if !config.debug_tags.is_empty() {
        config.min_level = LogLevel::Debug;
    }

    if has_arg("--quiet") {
        config.min_level = LogLevel::Warning;
    }

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().verbose_tags.contains(&tag.to_debug_key())
}
