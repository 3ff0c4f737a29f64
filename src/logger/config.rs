/// Logger configuration derived from command-line flags
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{enabled_debug_modes_in, get_cmd_args, is_quiet_in, is_verbose_in};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    /// Tags with --debug-<tag> enabled
    pub debug_tags: HashSet<String>,
    /// When non-empty, only these tags are printed
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|cfg| cfg.clone())
        .unwrap_or_default()
}

pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut cfg) = LOGGER_CONFIG.write() {
        *cfg = config;
    }
}

/// Build the logger config from --debug-<tag>, --verbose and --quiet
pub fn init_from_args() {
    let args = get_cmd_args();
    let mut config = LoggerConfig::default();

    config.debug_tags = enabled_debug_modes_in(&args)
        .into_iter()
        .map(|mode| mode.to_string())
        .collect();

    if !config.debug_tags.is_empty() {
        config.min_level = LogLevel::Debug;
    }
    if is_verbose_in(&args) {
        config.min_level = LogLevel::Verbose;
    }
    if is_quiet_in(&args) {
        config.min_level = LogLevel::Warning;
    }

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.min_level == LogLevel::Verbose || config.debug_tags.contains(&tag.to_debug_key())
}
