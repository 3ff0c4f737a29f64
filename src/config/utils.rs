use super::schemas::Config;
/// Configuration utilities - loading, reloading, and access helpers
use once_cell::sync::{Lazy, OnceCell};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::RwLock;

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Defaults served before load_config() has run
static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default);

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from disk and initialize the global CONFIG
///
/// Called once at startup. A missing file falls back to schema defaults.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = if std::path::Path::new(path).exists() {
        read_config_file(path)?
    } else {
        eprintln!("⚠️  Config file '{}' not found, using default values", path);
        Config::default()
    };

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Parse a TOML file into a Config without touching the global
pub fn read_config_file(path: &str) -> Result<Config, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

    toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))
}

/// Execute a function with read access to the configuration
///
/// ```rust,ignore
/// let margin_band = with_config(|cfg| cfg.swap.freshness_band);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get().map(|lock| lock.read()) {
        Some(Ok(config)) => f(&config),
        _ => f(&DEFAULT_CONFIG),
    }
}

// ============================================================================
// WALLET MANAGEMENT FUNCTIONS
// ============================================================================

/// Load the wallet keypair from the configuration
///
/// Supports a base58 encoded string or an array like `[1,2,3,...]`.
pub fn get_wallet_keypair() -> Result<Keypair, String> {
    with_config(|cfg| keypair_from_private_key(&cfg.wallet.private_key))
}

pub fn get_wallet_pubkey() -> Result<Pubkey, String> {
    get_wallet_keypair().map(|kp| kp.pubkey())
}

/// Parse a private key in either supported format
pub fn keypair_from_private_key(private_key: &str) -> Result<Keypair, String> {
    let private_key = private_key.trim();
    if private_key.is_empty() {
        return Err("Wallet private key is empty in config".to_string());
    }

    let bytes = if private_key.starts_with('[') && private_key.ends_with(']') {
        private_key
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("Failed to parse private key array: {}", e))?
    } else {
        bs58::decode(private_key)
            .into_vec()
            .map_err(|e| format!("Failed to decode base58 private key: {}", e))?
    };

    if bytes.len() != 64 {
        return Err(format!(
            "Invalid private key length: expected 64 bytes, got {}",
            bytes.len()
        ));
    }

    Keypair::from_bytes(&bytes).map_err(|e| format!("Failed to create keypair: {}", e))
}
