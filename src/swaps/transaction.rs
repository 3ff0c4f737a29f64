/// Transaction building: freshness check, order placement, settlement and teardown
use super::accounts::{create_open_orders_account, AccountResolution, OpenOrdersAccount};
use super::instructions::{place_order, settle_funds, OrderParams, PlaceOrderAccounts};
use super::types::{Side, TransactionPlan};
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::market::{MarketDetails, OrderBookSnapshot};
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

/// What the orchestrator wants to trade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderIntent {
    pub owner: Pubkey,
    pub side: Side,
    /// Best price the quote was computed against (lowest ask or highest bid)
    pub reference_price: f64,
    /// Base quantity
    pub size: f64,
}

impl OrderIntent {
    /// Limit price with the market's margin applied once
    pub fn limit_price(&self, margin: f64) -> f64 {
        match self.side {
            Side::Buy => self.reference_price * (1.0 + margin),
            Side::Sell => self.reference_price * (1.0 - margin),
        }
    }
}

pub struct TransactionBuilder {
    /// Allowed drift of the live best price from the quoted one
    freshness_band: f64,
}

impl TransactionBuilder {
    pub fn new(freshness_band: f64) -> Self {
        Self { freshness_band }
    }

    /// Reject the order when the live book moved away from the quote
    pub fn check_freshness(&self, intent: &OrderIntent, live: &OrderBookSnapshot) -> Result<(), SwapError> {
        match intent.side {
            Side::Buy => {
                let live_ask = live.lowest_ask();
                if live_ask <= 0.0 {
                    return Err(SwapError::unavailable("market-info", "live book has no asks"));
                }
                if live_ask > intent.reference_price * (1.0 + self.freshness_band) {
                    return Err(SwapError::StaleQuote {
                        quoted: intent.reference_price,
                        live: live_ask,
                    });
                }
            }
            Side::Sell => {
                let live_bid = live.highest_bid();
                if live_bid <= 0.0 {
                    return Err(SwapError::unavailable("market-info", "live book has no bids"));
                }
                if live_bid < intent.reference_price * (1.0 - self.freshness_band) {
                    return Err(SwapError::StaleQuote {
                        quoted: intent.reference_price,
                        live: live_bid,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn build(
        &self,
        intent: &OrderIntent,
        market: &MarketDetails,
        resolution: AccountResolution,
        live: &OrderBookSnapshot,
    ) -> Result<TransactionPlan, SwapError> {
        self.check_freshness(intent, live)?;

        let limit_price = intent.limit_price(market.swap_margin);
        let params = OrderParams::from_decimal(
            market,
            intent.side,
            limit_price,
            intent.size,
            uuid::Uuid::new_v4().as_u128() as u64,
        )?;

        let wrapped = resolution.wrapped_accounts();
        let (base_account, quote_account, open_orders, setup, mut signers) = resolution.into_parts();
        let open_orders_key = open_orders.pubkey();
        let is_new_order_account = open_orders.is_new();

        let mut instructions = setup;

        if let OpenOrdersAccount::New(keypair) = open_orders {
            instructions.push(create_open_orders_account(
                &intent.owner,
                &keypair.pubkey(),
                &market.program_id,
            ));
            signers.push(keypair);
        }

        let payer = match intent.side {
            Side::Buy => quote_account,
            Side::Sell => base_account,
        };
        instructions.push(place_order(
            market,
            &PlaceOrderAccounts {
                open_orders: open_orders_key,
                payer,
                owner: intent.owner,
            },
            &params,
        )?);

        instructions.push(settle_funds(
            market,
            &open_orders_key,
            &intent.owner,
            &base_account,
            &quote_account,
        )?);

        for account in &wrapped {
            instructions.push(
                spl_token::instruction::close_account(
                    &spl_token::id(),
                    account,
                    &intent.owner,
                    &intent.owner,
                    &[],
                )
                .map_err(|e| SwapError::Encoding(format!("close_account: {}", e)))?,
            );
        }

        logger::debug(
            LogTag::Transaction,
            &format!(
                "Built {} {} {} @ {:.10}: {} instructions, {} extra signers{}",
                intent.side,
                intent.size,
                market.base.name,
                limit_price,
                instructions.len(),
                signers.len(),
                if is_new_order_account { ", new open orders account" } else { "" }
            ),
        );

        Ok(TransactionPlan {
            instructions,
            signers,
            is_new_order_account,
            fee_payer: intent.owner,
            limit_price,
            size: intent.size,
        })
    }
}

impl TransactionPlan {
    /// Assemble a legacy transaction carrying the generated keys' signatures.
    /// The owner signature is added afterwards by the wallet.
    pub fn to_transaction(&self, recent_blockhash: Hash) -> Result<Transaction, SwapError> {
        let message = Message::new_with_blockhash(&self.instructions, Some(&self.fee_payer), &recent_blockhash);
        let mut transaction = Transaction::new_unsigned(message);

        let signers: Vec<&Keypair> = self.signers.iter().collect();
        transaction
            .try_partial_sign(&signers, recent_blockhash)
            .map_err(|e| SwapError::Signing(e.to_string()))?;

        Ok(transaction)
    }

    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|k| k.pubkey()).collect()
    }
}
