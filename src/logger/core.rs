/// Core logging implementation with automatic filtering
use super::config::{get_logger_config, is_debug_enabled_for_tag, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<module> for that tag (or --verbose)
/// 4. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(config, tag);
    }

    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&get_logger_config(), &tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_errors_always_logged() {
        let config = LoggerConfig {
            min_level: LogLevel::Warning,
            ..Default::default()
        };
        assert!(should_log(&config, &LogTag::Swap, LogLevel::Error));
        assert!(!should_log(&config, &LogTag::Swap, LogLevel::Info));
    }

    #[test]
    fn test_debug_requires_tag_flag() {
        let mut debug_tags = HashSet::new();
        debug_tags.insert("quote".to_string());
        let config = LoggerConfig {
            min_level: LogLevel::Debug,
            debug_tags,
            enabled_tags: HashSet::new(),
        };

        assert!(should_log(&config, &LogTag::Quote, LogLevel::Debug));
        assert!(!should_log(&config, &LogTag::Rpc, LogLevel::Debug));
        assert!(should_log(&config, &LogTag::Rpc, LogLevel::Info));
    }
}
