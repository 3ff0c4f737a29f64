pub mod apis;
pub mod arguments;
pub mod config;
pub mod constants;
pub mod errors; // Structured error handling
pub mod logger;
pub mod market; // Market layout, order book snapshots and feed
pub mod rpc;
pub mod swaps;
pub mod utils;
pub mod wallet; // Wallet balance lookups
