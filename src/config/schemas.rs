/// Configuration schemas - all config structures defined once with defaults
use crate::config_struct;

// ============================================================================
// RPC CONFIGURATION
// ============================================================================

config_struct! {
    /// JSON-RPC endpoint configuration
    pub struct RpcConfig {
        url: String = "https://api.mainnet-beta.solana.com".to_string(),
        timeout_secs: u64 = 30,
        /// Commitment used for reads and parsed transaction lookups
        commitment: String = "confirmed".to_string(),
    }
}

// ============================================================================
// MARKET DATA API
// ============================================================================

config_struct! {
    /// REST market data service (token prices and market snapshots)
    pub struct ApiConfig {
        enabled: bool = false,
        /// Base URL including trailing slash, e.g. https://host/api/
        base_url: String = String::new(),
        timeout_secs: u64 = 10,
    }
}

// ============================================================================
// SWAP EXECUTION
// ============================================================================

config_struct! {
    /// Swap execution tuning
    pub struct SwapConfig {
        /// Allowed drift of the live best price versus the quoted one
        freshness_band: f64 = 0.05,
        /// Lamports added on top of the wrapped amount for the ephemeral wSOL account
        wrap_buffer_lamports: u64 = 10_000_000,
        confirmation_timeout_secs: u64 = 90,
        poll_interval_ms: u64 = 1000,
        /// Upper bound of the backoff applied on transient read errors
        max_backoff_ms: u64 = 8000,
        /// Refuse quotes that would consume more than this many levels
        max_slots_consumed: usize = 1,
    }
}

// ============================================================================
// MARKET FEED
// ============================================================================

config_struct! {
    /// Order-book refresh cadence
    pub struct FeedConfig {
        refresh_interval_ms: u64 = 2000,
        /// Every Nth tick is read from chain even when the API is healthy
        onchain_every_ticks: u64 = 15,
        stale_alert_minutes: i64 = 61,
        /// Maximum relative spread for adopting an incoming side
        max_spread: f64 = 0.10,
    }
}

// ============================================================================
// MARKETS
// ============================================================================

config_struct! {
    /// One tradable market
    pub struct MarketEntry {
        name: String = String::new(),
        address: String = String::new(),
        base_name: String = String::new(),
        quote_name: String = String::new(),
        min_base: f64 = 0.0,
        swap_margin: f64 = 0.0004,
    }
}

config_struct! {
    /// Exchange program and the configured market list
    pub struct MarketsConfig {
        dex_program_id: String = crate::constants::OPENBOOK_PROGRAM_ID.to_string(),
        list: Vec<MarketEntry> = default_markets(),
    }
}

fn default_markets() -> Vec<MarketEntry> {
    vec![
        MarketEntry {
            name: "BONK/USDC".to_string(),
            address: "8PhnCfgqpgFM7ZJvttGdBVMXHuU4Q23ACxCvWkbs1M71".to_string(),
            base_name: "BONK".to_string(),
            quote_name: "USDC".to_string(),
            min_base: 1000.0,
            swap_margin: 0.0004,
        },
        MarketEntry {
            name: "BONK/SOL".to_string(),
            address: "Hs97TCZeuYiJxooo3U73qEHXg3dKpRL4uYKYRryEK9CF".to_string(),
            base_name: "BONK".to_string(),
            quote_name: "SOL".to_string(),
            min_base: 1000.0,
            swap_margin: 0.0004,
        },
    ]
}

// ============================================================================
// WALLET
// ============================================================================

config_struct! {
    /// Signing wallet
    pub struct WalletConfig {
        /// Base58 string or `[1,2,...]` byte array
        private_key: String = String::new(),
    }
}

// ============================================================================
// LOGGING
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        file_enabled: bool = true,
        file_path: String = "data/logs/openbook-swap.log".to_string(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root configuration loaded from data/config.toml
    pub struct Config {
        rpc: RpcConfig = RpcConfig::default(),
        api: ApiConfig = ApiConfig::default(),
        swap: SwapConfig = SwapConfig::default(),
        feed: FeedConfig = FeedConfig::default(),
        markets: MarketsConfig = MarketsConfig::default(),
        wallet: WalletConfig = WalletConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}

impl MarketsConfig {
    /// Find a market by name (case-insensitive) or by address
    pub fn find(&self, name_or_address: &str) -> Option<&MarketEntry> {
        self.list.iter().find(|m| {
            m.name.eq_ignore_ascii_case(name_or_address) || m.address == name_or_address
        })
    }
}
