/// OpenBook v3 instruction encoders
///
/// Wire layout: `[0u8 version] ++ u32 LE tag ++ fields LE`.
use super::types::Side;
use crate::constants::ORDER_MATCH_LIMIT;
use crate::errors::SwapError;
use crate::market::MarketDetails;
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    sysvar,
};

const INSTRUCTION_VERSION: u8 = 0;

pub const TAG_SETTLE_FUNDS: u32 = 5;
pub const TAG_NEW_ORDER_V3: u32 = 10;
pub const TAG_CLOSE_OPEN_ORDERS: u32 = 14;

const SELF_TRADE_DECREMENT_TAKE: u32 = 0;
const ORDER_TYPE_IMMEDIATE_OR_CANCEL: u32 = 1;

#[derive(Debug, Clone, BorshSerialize)]
struct NewOrderV3Data {
    side: u32,
    limit_price: u64,
    max_coin_qty: u64,
    max_native_pc_qty_including_fees: u64,
    self_trade_behavior: u32,
    order_type: u32,
    client_order_id: u64,
    limit: u16,
    max_ts: i64,
}

fn encode<T: BorshSerialize>(tag: u32, fields: Option<&T>) -> Result<Vec<u8>, SwapError> {
    let mut data = vec![INSTRUCTION_VERSION];
    data.extend_from_slice(&tag.to_le_bytes());
    if let Some(fields) = fields {
        fields
            .serialize(&mut data)
            .map_err(|e| SwapError::Encoding(format!("instruction {}: {}", tag, e)))?;
    }
    Ok(data)
}

/// Accounts a NewOrderV3 needs besides the market layout
#[derive(Debug, Clone, Copy)]
pub struct PlaceOrderAccounts {
    pub open_orders: Pubkey,
    /// Token account the order is funded from
    pub payer: Pubkey,
    pub owner: Pubkey,
}

/// Immediate-or-cancel limit order in lot units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderParams {
    pub side: Side,
    pub limit_price_lots: u64,
    pub max_base_lots: u64,
    pub max_quote_including_fees: u64,
    pub client_order_id: u64,
}

impl OrderParams {
    /// Convert a decimal price and size into lots for `market`
    pub fn from_decimal(
        market: &MarketDetails,
        side: Side,
        price: f64,
        size: f64,
        client_order_id: u64,
    ) -> Result<Self, SwapError> {
        let limit_price_lots = market.price_to_lots(price);
        let max_base_lots = market.size_to_lots(size);
        if limit_price_lots == 0 {
            return Err(SwapError::validation("price", format!("{} rounds to zero lots", price)));
        }
        if max_base_lots == 0 {
            return Err(SwapError::validation("size", format!("{} rounds to zero lots", size)));
        }

        let max_quote_including_fees = market
            .layout
            .quote_lot_size
            .saturating_mul(limit_price_lots)
            .saturating_mul(max_base_lots);

        Ok(Self {
            side,
            limit_price_lots,
            max_base_lots,
            max_quote_including_fees,
            client_order_id,
        })
    }
}

/// NewOrderV3, immediate-or-cancel with decrement-take self trade handling
pub fn place_order(
    market: &MarketDetails,
    accounts: &PlaceOrderAccounts,
    params: &OrderParams,
) -> Result<Instruction, SwapError> {
    let fields = NewOrderV3Data {
        side: match params.side {
            Side::Buy => 0,
            Side::Sell => 1,
        },
        limit_price: params.limit_price_lots,
        max_coin_qty: params.max_base_lots,
        max_native_pc_qty_including_fees: params.max_quote_including_fees,
        self_trade_behavior: SELF_TRADE_DECREMENT_TAKE,
        order_type: ORDER_TYPE_IMMEDIATE_OR_CANCEL,
        client_order_id: params.client_order_id,
        limit: ORDER_MATCH_LIMIT,
        max_ts: i64::MAX,
    };

    let layout = &market.layout;
    Ok(Instruction {
        program_id: market.program_id,
        accounts: vec![
            AccountMeta::new(market.address, false),
            AccountMeta::new(accounts.open_orders, false),
            AccountMeta::new(layout.request_queue, false),
            AccountMeta::new(layout.event_queue, false),
            AccountMeta::new(layout.bids, false),
            AccountMeta::new(layout.asks, false),
            AccountMeta::new(accounts.payer, false),
            AccountMeta::new_readonly(accounts.owner, true),
            AccountMeta::new(market.base.vault, false),
            AccountMeta::new(market.quote.vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: encode(TAG_NEW_ORDER_V3, Some(&fields))?,
    })
}

/// SettleFunds: move filled balances from the open orders account back to the owner
pub fn settle_funds(
    market: &MarketDetails,
    open_orders: &Pubkey,
    owner: &Pubkey,
    base_account: &Pubkey,
    quote_account: &Pubkey,
) -> Result<Instruction, SwapError> {
    let vault_signer = market.vault_signer()?;
    Ok(Instruction {
        program_id: market.program_id,
        accounts: vec![
            AccountMeta::new(market.address, false),
            AccountMeta::new(*open_orders, false),
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(market.base.vault, false),
            AccountMeta::new(market.quote.vault, false),
            AccountMeta::new(*base_account, false),
            AccountMeta::new(*quote_account, false),
            AccountMeta::new_readonly(vault_signer, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: encode::<()>(TAG_SETTLE_FUNDS, None)?,
    })
}

/// CloseOpenOrders: reclaim the rent of an empty open orders account
pub fn close_open_orders(
    market: &MarketDetails,
    open_orders: &Pubkey,
    owner: &Pubkey,
    destination: &Pubkey,
) -> Result<Instruction, SwapError> {
    Ok(Instruction {
        program_id: market.program_id,
        accounts: vec![
            AccountMeta::new(*open_orders, false),
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(market.address, false),
        ],
        data: encode::<()>(TAG_CLOSE_OPEN_ORDERS, None)?,
    })
}
