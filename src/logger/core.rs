/// Core logging implementation with automatic filtering

use super::config::{ get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag };
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<tag> for that tag
/// 4. Verbose level requires --verbose OR --verbose-<tag>
/// 5. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let config = get_logger_config();

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag);
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag);
    }

    if !config.enabled_tags.is_empty() {
        return config.enabled_tags.contains(&tag.to_debug_key());
    }

    true
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}
