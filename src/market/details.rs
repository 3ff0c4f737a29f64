/// Market details: configured identity plus the decoded on-chain market state
use crate::config::MarketEntry;
use crate::constants::{MINT_DECIMALS_OFFSET, NATIVE_QUOTE_VAULT_SIGNER};
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::rpc::ChainClient;
use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Serum v3 / OpenBook market account (MarketStateV2 without trailing padding)
#[derive(Debug, Clone, BorshDeserialize)]
pub struct MarketState {
    pub head_padding: [u8; 5],
    pub account_flags: u64,
    pub own_address: [u8; 32],
    pub vault_signer_nonce: u64,
    pub coin_mint: [u8; 32],
    pub pc_mint: [u8; 32],
    pub coin_vault: [u8; 32],
    pub coin_deposits_total: u64,
    pub coin_fees_accrued: u64,
    pub pc_vault: [u8; 32],
    pub pc_deposits_total: u64,
    pub pc_fees_accrued: u64,
    pub pc_dust_threshold: u64,
    pub request_queue: [u8; 32],
    pub event_queue: [u8; 32],
    pub bids: [u8; 32],
    pub asks: [u8; 32],
    pub coin_lot_size: u64,
    pub pc_lot_size: u64,
    pub fee_rate_bps: u64,
    pub referrer_rebates_accrued: u64,
}

/// Size of the market account including head and tail padding
pub const MARKET_STATE_SIZE: usize = 388;

impl MarketState {
    pub fn decode(data: &[u8]) -> Result<Self, SwapError> {
        if data.len() < MARKET_STATE_SIZE {
            return Err(SwapError::Encoding(format!(
                "market account too small: {} bytes",
                data.len()
            )));
        }
        if &data[..5] != b"serum" {
            return Err(SwapError::Encoding("market account missing serum header".into()));
        }

        let mut slice = data;
        MarketState::deserialize(&mut slice)
            .map_err(|e| SwapError::Encoding(format!("market state: {}", e)))
    }
}

/// One side of a market
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDescriptor {
    pub name: String,
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn is_native(&self) -> bool {
        self.mint == spl_token::native_mint::id()
    }
}

/// Accounts and lot sizes needed to encode orders
#[derive(Debug, Clone, PartialEq)]
pub struct MarketLayout {
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    pub request_queue: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub vault_signer_nonce: u64,
}

/// Everything the engine knows about one market. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDetails {
    pub name: String,
    pub address: Pubkey,
    pub program_id: Pubkey,
    pub base: TokenDescriptor,
    pub quote: TokenDescriptor,
    /// Minimum tradable base quantity
    pub min_base: f64,
    /// Price buffer applied to limit prices and quoted outputs
    pub swap_margin: f64,
    pub layout: MarketLayout,
}

impl MarketDetails {
    /// Assemble details from a config entry and decoded account data
    pub fn from_state(
        entry: &MarketEntry,
        address: Pubkey,
        program_id: Pubkey,
        state: &MarketState,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Self {
        Self {
            name: entry.name.clone(),
            address,
            program_id,
            base: TokenDescriptor {
                name: entry.base_name.clone(),
                mint: Pubkey::new_from_array(state.coin_mint),
                vault: Pubkey::new_from_array(state.coin_vault),
                decimals: base_decimals,
            },
            quote: TokenDescriptor {
                name: entry.quote_name.clone(),
                mint: Pubkey::new_from_array(state.pc_mint),
                vault: Pubkey::new_from_array(state.pc_vault),
                decimals: quote_decimals,
            },
            min_base: entry.min_base,
            swap_margin: entry.swap_margin,
            layout: MarketLayout {
                bids: Pubkey::new_from_array(state.bids),
                asks: Pubkey::new_from_array(state.asks),
                event_queue: Pubkey::new_from_array(state.event_queue),
                request_queue: Pubkey::new_from_array(state.request_queue),
                base_lot_size: state.coin_lot_size,
                quote_lot_size: state.pc_lot_size,
                vault_signer_nonce: state.vault_signer_nonce,
            },
        }
    }

    pub fn has_native_side(&self) -> bool {
        self.base.is_native() || self.quote.is_native()
    }

    /// Authority over the market vaults used by SettleFunds
    pub fn vault_signer(&self) -> Result<Pubkey, SwapError> {
        if self.quote.is_native() {
            return Pubkey::from_str(NATIVE_QUOTE_VAULT_SIGNER)
                .map_err(|e| SwapError::Config(format!("vault signer: {}", e)));
        }

        let nonce = self.layout.vault_signer_nonce.to_le_bytes();
        Pubkey::create_program_address(&[self.address.as_ref(), &nonce], &self.program_id)
            .map_err(|e| SwapError::Encoding(format!("vault signer derivation: {}", e)))
    }

    /// Convert a decimal price into price lots
    pub fn price_to_lots(&self, price: f64) -> u64 {
        let numerator = price
            * 10f64.powi(self.quote.decimals as i32)
            * self.layout.base_lot_size as f64;
        let denominator =
            10f64.powi(self.base.decimals as i32) * self.layout.quote_lot_size as f64;
        if denominator <= 0.0 {
            return 0;
        }
        (numerator / denominator).round().max(0.0) as u64
    }

    /// Convert a decimal base quantity into base lots
    pub fn size_to_lots(&self, size: f64) -> u64 {
        if self.layout.base_lot_size == 0 {
            return 0;
        }
        (size * 10f64.powi(self.base.decimals as i32) / self.layout.base_lot_size as f64)
            .round()
            .max(0.0) as u64
    }

    /// Convert price lots back to a decimal price
    pub fn price_lots_to_number(&self, price_lots: u64) -> f64 {
        let numerator = price_lots as f64
            * self.layout.quote_lot_size as f64
            * 10f64.powi(self.base.decimals as i32);
        let denominator =
            self.layout.base_lot_size as f64 * 10f64.powi(self.quote.decimals as i32);
        if denominator <= 0.0 {
            return 0.0;
        }
        numerator / denominator
    }

    /// Convert base lots back to a decimal quantity
    pub fn size_lots_to_number(&self, size_lots: u64) -> f64 {
        size_lots as f64 * self.layout.base_lot_size as f64 / 10f64.powi(self.base.decimals as i32)
    }
}

/// Read decimals out of raw SPL mint data
pub fn decode_mint_decimals(data: &[u8]) -> Result<u8, SwapError> {
    data.get(MINT_DECIMALS_OFFSET)
        .copied()
        .ok_or_else(|| SwapError::Encoding("mint account too small".into()))
}

/// Load details for a configured market from chain
pub async fn load_market_details(
    client: &dyn ChainClient,
    entry: &MarketEntry,
    program_id: &Pubkey,
) -> Result<MarketDetails, SwapError> {
    let address = Pubkey::from_str(&entry.address)
        .map_err(|e| SwapError::Config(format!("market {} address: {}", entry.name, e)))?;

    let data = client
        .get_account_data(&address)
        .await?
        .ok_or_else(|| SwapError::unavailable("market-info", format!("{} not found", address)))?;

    let state = MarketState::decode(&data)?;
    if state.own_address != address.to_bytes() {
        return Err(SwapError::unavailable(
            "market-info",
            format!("{} is not a market account", address),
        ));
    }

    let base_mint = Pubkey::new_from_array(state.coin_mint);
    let quote_mint = Pubkey::new_from_array(state.pc_mint);
    let base_decimals = load_mint_decimals(client, &base_mint).await?;
    let quote_decimals = load_mint_decimals(client, &quote_mint).await?;

    let details = MarketDetails::from_state(
        entry,
        address,
        *program_id,
        &state,
        base_decimals,
        quote_decimals,
    );

    logger::info(
        LogTag::Market,
        &format!(
            "Loaded market {} ({}): base lot {}, quote lot {}, decimals {}/{}",
            details.name,
            details.address,
            details.layout.base_lot_size,
            details.layout.quote_lot_size,
            base_decimals,
            quote_decimals
        ),
    );

    Ok(details)
}

async fn load_mint_decimals(client: &dyn ChainClient, mint: &Pubkey) -> Result<u8, SwapError> {
    let data = client
        .get_account_data(mint)
        .await?
        .ok_or_else(|| SwapError::unavailable("mint", format!("{} not found", mint)))?;
    decode_mint_decimals(&data)
}
