//! Structured logging for topichub
//!
//! This module provides a small tag/level logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-tag debug control via --debug-<tag> flags
//! - Colored, aligned console output
//!
//! ## Usage
//!
//! ```rust
//! use topichub::logger::{self, LogTag};
//!
//! logger::info(LogTag::Connection, "Identified");
//! logger::debug(LogTag::Codec, "raw frame ..."); // Only if --debug-codec
//! ```
//!
//! Call `logger::init()` once at startup to pick up command-line flags.
//! Without it every tag logs at INFO and above.

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{ get_logger_config, init_from_args, set_logger_config, LoggerConfig };
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system from command-line arguments
pub fn init() {
    config::init_from_args();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless --quiet)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the `--debug-<tag>` flag for this tag was given.
///
/// # Example
/// ```rust
/// use topichub::logger::{self, LogTag};
///
/// // Only shown with --debug-connection
/// logger::debug(LogTag::Connection, "status Identifying -> Identified");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}
