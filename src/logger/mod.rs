//! Structured logging for the swap engine
//!
//! Same shape as every other service in this codebase:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Colored console output plus an optional append-only log file
//!
//! ```rust,ignore
//! use openbook_swap::logger::{self, LogTag};
//!
//! logger::info(LogTag::Swap, "Swap submitted");
//! logger::debug(LogTag::Quote, "Walked 3 levels"); // Only with --debug-quote
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses debug flags from the command line and opens the log file when a
/// path is given. Call once at startup before any logging occurs.
pub fn init(log_file: Option<&str>) {
    config::init_from_args();

    if let Some(path) = log_file {
        file::init_file_logging(path);
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level, only shown when --debug-<tag> is given
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level, only shown with --verbose
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending log file writes
pub fn flush() {
    file::flush_file_logging();
}
