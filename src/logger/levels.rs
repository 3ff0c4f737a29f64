/// Severity of a log line. `LoggerConfig::min_level` is the cut-off:
/// `--quiet` lowers it to Warning, `--debug-<tag>` raises it to Debug for
/// the flagged tags, `--verbose` opens everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Printed even under --quiet
    Error,
    Warning,
    /// Swap progress, confirmations, feed mode switches
    Info,
    /// Per-tag diagnostics: quote walks, account resolution, RPC calls
    Debug,
    Verbose,
}

impl LogLevel {
    /// Label written into console and file lines
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }
}
