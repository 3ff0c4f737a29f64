/// Global constants used across the swap engine
///
/// Values here are protocol facts, not tunables. Tunables live in config.

// ============================================================================
// SOLANA BLOCKCHAIN CONSTANTS
// ============================================================================

/// Lamports per SOL (10^9)
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// SPL token account size
pub const TOKEN_ACCOUNT_SPACE: u64 = 165;

// ============================================================================
// OPENBOOK / SERUM V3
// ============================================================================

/// OpenBook v3 DEX program
pub const OPENBOOK_PROGRAM_ID: &str = "srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX";

/// Vault signer used by SOL-quoted markets
pub const NATIVE_QUOTE_VAULT_SIGNER: &str = "51Cdt3oASXuVD88tAqJEeR6XH3PjQQ3xb7Cd22KaW2GK";

/// Open orders account size (5 + 8 + 32*2 + 8*4 + 16*2 + 128*16 + 128*8 + 8 + 7)
pub const OPEN_ORDERS_SPACE: u64 = 3228;

/// Byte offset of `owner` in the open orders layout, used for memcmp filters
pub const OPEN_ORDERS_OWNER_OFFSET: usize = 45;

/// Byte offset of `market` in the open orders layout
pub const OPEN_ORDERS_MARKET_OFFSET: usize = 13;

/// Buy output is quantized down to this many base units
pub const BUY_OUTPUT_STEP: f64 = 1000.0;

/// Order count limit passed with each NewOrderV3
pub const ORDER_MATCH_LIMIT: u16 = 65535;

// ============================================================================
// SPL MINT LAYOUT
// ============================================================================

/// Byte offset of `decimals` in an SPL mint account
pub const MINT_DECIMALS_OFFSET: usize = 44;
