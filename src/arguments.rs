/// Centralized argument handling for the swap engine
///
/// Debug flags are plain `--debug-<module>` switches read from the process
/// arguments. The CLI itself is parsed by clap in main.rs; this module only
/// answers "is this debug mode on" questions for the logger and the engine.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    contains_arg(&get_cmd_args(), arg)
}

fn contains_arg(args: &[String], arg: &str) -> bool {
    args.iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Every debug mode understood by the engine, without the `--debug-` prefix
pub const DEBUG_MODES: &[&str] = &[
    "swap",
    "quote",
    "market",
    "accounts",
    "transaction",
    "confirm",
    "rpc",
    "api",
    "wallet",
    "system",
];

/// Dry run: build and print the transaction plan without submitting
pub fn is_dry_run_enabled() -> bool {
    has_arg("--dry-run")
}

/// Verbose logging for every tag
pub fn is_verbose_in(args: &[String]) -> bool {
    contains_arg(args, "--verbose") || contains_arg(args, "-v")
}

/// Only warnings and errors
pub fn is_quiet_in(args: &[String]) -> bool {
    contains_arg(args, "--quiet") || contains_arg(args, "-q")
}

/// Returns the debug modes present in the given argument list
pub fn enabled_debug_modes_in(args: &[String]) -> Vec<&'static str> {
    DEBUG_MODES
        .iter()
        .copied()
        .filter(|mode| contains_arg(args, &format!("--debug-{}", mode)))
        .collect()
}

/// Returns all debug modes enabled for this process
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    enabled_debug_modes_in(&get_cmd_args())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_enabled_debug_modes_in() {
        let list = args(&["openbook-swap", "--debug-swap", "--debug-rpc", "--dry-run"]);
        let modes = enabled_debug_modes_in(&list);

        assert!(modes.contains(&"swap"));
        assert!(modes.contains(&"rpc"));
        assert!(!modes.contains(&"quote"));
        assert_eq!(modes.len(), 2);
    }

    #[test]
    fn test_global_args_roundtrip() {
        set_cmd_args(args(&["openbook-swap", "--debug-quote", "--market", "BONK/SOL"]));

        assert!(has_arg("--debug-quote"));
        assert!(!is_verbose_in(&get_cmd_args()));
        assert!(!has_arg("--debug-wallet"));
        assert_eq!(get_arg_value("--market"), Some("BONK/SOL".to_string()));
        assert_eq!(get_arg_value("--side"), None);
    }
}
