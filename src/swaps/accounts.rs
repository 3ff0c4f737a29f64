/// Account resolution for one swap attempt
///
/// Decides, per side of the market, which token account the order uses and
/// which setup instructions must run first. Wrapped SOL always gets a fresh
/// ephemeral account; SPL tokens reuse the single existing account or get an
/// associated account created. Several candidates is an error, never a guess.
use super::types::Side;
use crate::constants::{OPEN_ORDERS_SPACE, TOKEN_ACCOUNT_SPACE};
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::market::{MarketDetails, TokenDescriptor};
use crate::rpc::ChainClient;
use crate::utils::sol_to_lamports;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use std::sync::Arc;

const ACCOUNTS_UNAVAILABLE: &str = "accounts-unavailable";

/// How a token account was obtained
#[derive(Debug)]
pub enum ResolvedAccount {
    /// Generated for this attempt, must sign the transaction
    New(Keypair),
    /// Already on chain and owned by the wallet
    Existing(Pubkey),
    /// Associated account whose creation is scheduled in the setup
    Derived(Pubkey),
}

impl ResolvedAccount {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            ResolvedAccount::New(keypair) => keypair.pubkey(),
            ResolvedAccount::Existing(pubkey) | ResolvedAccount::Derived(pubkey) => *pubkey,
        }
    }

    pub fn keypair(&self) -> Option<&Keypair> {
        match self {
            ResolvedAccount::New(keypair) => Some(keypair),
            _ => None,
        }
    }
}

/// Open orders account of the wallet on this market
#[derive(Debug)]
pub enum OpenOrdersAccount {
    /// Allocated by the order placement step of this attempt
    New(Keypair),
    Existing(Pubkey),
}

impl OpenOrdersAccount {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            OpenOrdersAccount::New(keypair) => keypair.pubkey(),
            OpenOrdersAccount::Existing(pubkey) => *pubkey,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, OpenOrdersAccount::New(_))
    }
}

/// Lamports to move into each side's wrapped SOL account, before the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WrapLamports {
    pub base: u64,
    pub quote: u64,
}

impl WrapLamports {
    /// The paying side is funded with the order's notional when it is native
    pub fn for_order(side: Side, market: &MarketDetails, price: f64, size: f64) -> Self {
        match side {
            Side::Buy if market.quote.is_native() => Self {
                base: 0,
                quote: sol_to_lamports(price * size),
            },
            Side::Sell if market.base.is_native() => Self {
                base: sol_to_lamports(size),
                quote: 0,
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug)]
pub struct AccountResolution {
    pub base: ResolvedAccount,
    pub quote: ResolvedAccount,
    pub open_orders: OpenOrdersAccount,
    /// Instructions that must run before the order
    pub setup: Vec<Instruction>,
}

impl AccountResolution {
    pub fn is_new_order_account(&self) -> bool {
        self.open_orders.is_new()
    }

    /// Ephemeral wrapped SOL accounts that must be closed after settling
    pub fn wrapped_accounts(&self) -> Vec<Pubkey> {
        [&self.base, &self.quote]
            .into_iter()
            .filter_map(|account| account.keypair().map(|k| k.pubkey()))
            .collect()
    }

    /// Consume the resolution, handing over generated keys for signing
    pub fn into_parts(self) -> (Pubkey, Pubkey, OpenOrdersAccount, Vec<Instruction>, Vec<Keypair>) {
        let base_key = self.base.pubkey();
        let quote_key = self.quote.pubkey();
        let mut signers = Vec::new();
        for account in [self.base, self.quote] {
            if let ResolvedAccount::New(keypair) = account {
                signers.push(keypair);
            }
        }
        (base_key, quote_key, self.open_orders, self.setup, signers)
    }
}

pub struct AccountResolver {
    client: Arc<dyn ChainClient>,
    wrap_buffer_lamports: u64,
}

impl AccountResolver {
    pub fn new(client: Arc<dyn ChainClient>, wrap_buffer_lamports: u64) -> Self {
        Self {
            client,
            wrap_buffer_lamports,
        }
    }

    pub async fn resolve(
        &self,
        owner: &Pubkey,
        market: &MarketDetails,
        wrap: WrapLamports,
    ) -> Result<AccountResolution, SwapError> {
        let mut setup = Vec::new();

        let base = self
            .resolve_token(owner, &market.base, wrap.base, &mut setup)
            .await?;
        let quote = self
            .resolve_token(owner, &market.quote, wrap.quote, &mut setup)
            .await?;
        let open_orders = self.resolve_open_orders(owner, market).await?;

        logger::debug(
            LogTag::Accounts,
            &format!(
                "Resolved accounts for {}: base={:?} quote={:?} open_orders={} setup={}",
                market.name,
                base,
                quote,
                open_orders.pubkey(),
                setup.len()
            ),
        );

        Ok(AccountResolution {
            base,
            quote,
            open_orders,
            setup,
        })
    }

    async fn resolve_token(
        &self,
        owner: &Pubkey,
        token: &TokenDescriptor,
        wrap_lamports: u64,
        setup: &mut Vec<Instruction>,
    ) -> Result<ResolvedAccount, SwapError> {
        if token.is_native() {
            let account = Keypair::new();
            let lamports = wrap_lamports.saturating_add(self.wrap_buffer_lamports);
            setup.push(system_instruction::create_account(
                owner,
                &account.pubkey(),
                lamports,
                TOKEN_ACCOUNT_SPACE,
                &spl_token::id(),
            ));
            setup.push(
                spl_token::instruction::initialize_account(
                    &spl_token::id(),
                    &account.pubkey(),
                    &token.mint,
                    owner,
                )
                .map_err(|e| SwapError::Encoding(format!("initialize_account: {}", e)))?,
            );
            return Ok(ResolvedAccount::New(account));
        }

        let accounts = self
            .client
            .get_token_accounts(owner, &token.mint)
            .await
            .map_err(|e| SwapError::unavailable(ACCOUNTS_UNAVAILABLE, e.to_string()))?;

        match accounts.as_slice() {
            [] => {
                let derived = get_associated_token_address(owner, &token.mint);
                setup.push(create_associated_token_account(
                    owner,
                    owner,
                    &token.mint,
                    &spl_token::id(),
                ));
                Ok(ResolvedAccount::Derived(derived))
            }
            [single] => Ok(ResolvedAccount::Existing(single.address)),
            many => Err(SwapError::ambiguity(
                format!("{} token account", token.name),
                many.len(),
            )),
        }
    }

    async fn resolve_open_orders(
        &self,
        owner: &Pubkey,
        market: &MarketDetails,
    ) -> Result<OpenOrdersAccount, SwapError> {
        let accounts = self
            .client
            .get_open_orders_accounts(&market.program_id, &market.address, owner)
            .await
            .map_err(|e| SwapError::unavailable(ACCOUNTS_UNAVAILABLE, e.to_string()))?;

        match accounts.as_slice() {
            [] => Ok(OpenOrdersAccount::New(Keypair::new())),
            [single] => Ok(OpenOrdersAccount::Existing(*single)),
            many => Err(SwapError::ambiguity("open orders account", many.len())),
        }
    }
}

/// System instruction allocating a fresh open orders account owned by the DEX
pub fn create_open_orders_account(owner: &Pubkey, open_orders: &Pubkey, program_id: &Pubkey) -> Instruction {
    let lamports = Rent::default().minimum_balance(OPEN_ORDERS_SPACE as usize);
    system_instruction::create_account(owner, open_orders, lamports, OPEN_ORDERS_SPACE, program_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::details::fixtures::sample_details;
    use crate::rpc::mock::MockChain;

    const BUFFER: u64 = 10_000_000;

    #[tokio::test]
    async fn test_existing_accounts_are_reused() {
        let market = sample_details(false);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        let base = chain.add_token_account(owner, market.base.mint, 100.0);
        let quote = chain.add_token_account(owner, market.quote.mint, 5.0);
        let oo = chain.add_open_orders(market.address, owner);

        let resolver = AccountResolver::new(chain, BUFFER);
        for _ in 0..2 {
            let resolution = resolver
                .resolve(&owner, &market, WrapLamports::default())
                .await
                .unwrap();
            assert_eq!(resolution.base.pubkey(), base);
            assert_eq!(resolution.quote.pubkey(), quote);
            assert_eq!(resolution.open_orders.pubkey(), oo);
            assert!(resolution.setup.is_empty());
            assert!(resolution.wrapped_accounts().is_empty());
            assert!(!resolution.is_new_order_account());
        }
    }

    #[tokio::test]
    async fn test_missing_token_account_is_derived() {
        let market = sample_details(false);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        chain.add_token_account(owner, market.quote.mint, 5.0);

        let resolution = AccountResolver::new(chain, BUFFER)
            .resolve(&owner, &market, WrapLamports::default())
            .await
            .unwrap();

        match &resolution.base {
            ResolvedAccount::Derived(address) => {
                assert_eq!(*address, get_associated_token_address(&owner, &market.base.mint));
            }
            other => panic!("expected derived account, got {:?}", other),
        }
        assert_eq!(resolution.setup.len(), 1);
        assert_eq!(resolution.setup[0].program_id, spl_associated_token_account::id());
        assert!(resolution.is_new_order_account());

        let (_, _, _, _, signers) = resolution.into_parts();
        assert!(signers.is_empty());
    }

    #[tokio::test]
    async fn test_native_side_gets_ephemeral_account() {
        let market = sample_details(true);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        chain.add_token_account(owner, market.base.mint, 100.0);

        let wrap = WrapLamports::for_order(Side::Buy, &market, 0.5, 2.0);
        assert_eq!(wrap.quote, 1_000_000_000);

        let resolution = AccountResolver::new(chain, BUFFER)
            .resolve(&owner, &market, wrap)
            .await
            .unwrap();

        assert!(matches!(resolution.quote, ResolvedAccount::New(_)));
        assert_eq!(resolution.wrapped_accounts(), vec![resolution.quote.pubkey()]);
        // create_account + initialize_account
        assert_eq!(resolution.setup.len(), 2);
        assert_eq!(resolution.setup[1].program_id, spl_token::id());

        let (_, quote_key, _, _, signers) = resolution.into_parts();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey(), quote_key);
    }

    #[tokio::test]
    async fn test_multiple_candidates_are_ambiguous() {
        let market = sample_details(false);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        chain.add_token_account(owner, market.base.mint, 1.0);
        chain.add_token_account(owner, market.base.mint, 2.0);

        let err = AccountResolver::new(chain.clone(), BUFFER)
            .resolve(&owner, &market, WrapLamports::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::AccountAmbiguity { count: 2, .. }));

        let market = sample_details(true);
        chain.add_open_orders(market.address, owner);
        chain.add_open_orders(market.address, owner);
        chain.add_token_account(owner, market.base.mint, 1.0);
        let err = AccountResolver::new(chain, BUFFER)
            .resolve(&owner, &market, WrapLamports::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "account-ambiguity");
    }

    #[tokio::test]
    async fn test_read_failure_maps_to_unavailable() {
        let market = sample_details(false);
        let chain = Arc::new(MockChain::new());
        *chain.reads_fail.lock() = true;

        let err = AccountResolver::new(chain, BUFFER)
            .resolve(&Pubkey::new_unique(), &market, WrapLamports::default())
            .await
            .unwrap_err();
        match err {
            SwapError::DataUnavailable { what, .. } => assert_eq!(what, ACCOUNTS_UNAVAILABLE),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrap_lamports_only_for_native_paying_side() {
        let market = sample_details(true);
        assert_eq!(WrapLamports::for_order(Side::Sell, &market, 0.5, 2.0), WrapLamports::default());

        let market = sample_details(false);
        assert_eq!(WrapLamports::for_order(Side::Buy, &market, 0.5, 2.0), WrapLamports::default());
    }
}
