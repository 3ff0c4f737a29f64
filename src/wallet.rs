/// Wallet balance lookups for the tokens of a market
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::market::{MarketDetails, TokenDescriptor};
use crate::rpc::ChainClient;
use crate::swaps::Side;
use crate::utils::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;

/// Native SOL balance of the wallet
pub async fn get_sol_balance(client: &dyn ChainClient, owner: &Pubkey) -> Result<f64, SwapError> {
    let lamports = client.get_balance(owner).await?;
    Ok(lamports_to_sol(lamports))
}

/// Balance of one market token. Wrapped SOL reports the native balance,
/// SPL tokens the first token account found (0 when there is none).
pub async fn get_token_balance(
    client: &dyn ChainClient,
    owner: &Pubkey,
    token: &TokenDescriptor,
) -> Result<f64, SwapError> {
    if token.is_native() {
        return get_sol_balance(client, owner).await;
    }

    let accounts = client.get_token_accounts(owner, &token.mint).await?;
    if accounts.len() > 1 {
        logger::debug(
            LogTag::Wallet,
            &format!("{} token accounts for {}, using the first", accounts.len(), token.name),
        );
    }
    Ok(accounts.first().map(|a| a.ui_amount).unwrap_or(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketBalances {
    pub base: f64,
    pub quote: f64,
}

impl MarketBalances {
    /// Balance of the asset spent by `side`
    pub fn paying(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.quote,
            Side::Sell => self.base,
        }
    }
}

pub async fn get_market_balances(
    client: &dyn ChainClient,
    owner: &Pubkey,
    market: &MarketDetails,
) -> Result<MarketBalances, SwapError> {
    let (base, quote) = futures::try_join!(
        get_token_balance(client, owner, &market.base),
        get_token_balance(client, owner, &market.quote)
    )?;
    Ok(MarketBalances { base, quote })
}
