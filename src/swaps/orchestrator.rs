/// Swap session: drives one market's swap attempts through their lifecycle
///
/// Validating -> Quoting -> BuildingAccounts -> BuildingTransaction ->
/// AwaitingSignature -> Submitted -> Confirming -> Succeeded | Failed
///
/// Every attempt reports exactly one terminal event to the listener.
use super::accounts::{AccountResolver, WrapLamports};
use super::confirmation::{ConfirmationReconciler, ConfirmationSettings};
use super::guard::AttemptGuards;
use super::quote::compute_quote;
use super::transaction::{OrderIntent, TransactionBuilder};
use super::types::{
    ExecutionResult, Quote, Side, SwapEvent, SwapListener, SwapRequest, SwapState, TransactionPlan,
};
use crate::config::with_config;
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::market::{MarketDetails, MarketFeed, OrderBookSnapshot};
use crate::rpc::{ChainClient, TransactionSigner};
use crate::utils::{format_amount, parse_amount};
use crate::wallet::get_token_balance;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub wrap_buffer_lamports: u64,
    pub freshness_band: f64,
    /// Orders needing more price levels than this are refused
    pub max_slots_consumed: usize,
    pub confirmation: ConfirmationSettings,
}

impl SessionSettings {
    pub fn from_config() -> Self {
        let confirmation = ConfirmationSettings::from_config();
        with_config(|cfg| Self {
            wrap_buffer_lamports: cfg.swap.wrap_buffer_lamports,
            freshness_band: cfg.swap.freshness_band,
            max_slots_consumed: cfg.swap.max_slots_consumed,
            confirmation,
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            wrap_buffer_lamports: 10_000_000,
            freshness_band: 0.05,
            max_slots_consumed: 1,
            confirmation: ConfirmationSettings::default(),
        }
    }
}

/// Listener that writes lifecycle events to the log
pub struct LogListener;

impl SwapListener for LogListener {
    fn on_event(&self, event: &SwapEvent) {
        match event {
            SwapEvent::StateChanged(state) => {
                logger::debug(LogTag::Swap, &format!("State -> {}", state));
            }
            SwapEvent::AwaitingConfirmation { signature } => {
                logger::info(LogTag::Swap, &format!("⏳ Awaiting confirmation for {}", signature));
            }
            SwapEvent::Succeeded(outcome) => {
                logger::info(LogTag::Swap, &format!("✅ Swap confirmed: {}", outcome.signature));
            }
            SwapEvent::Failed(err) => {
                logger::error(LogTag::Swap, &format!("❌ Swap failed [{}]: {}", err.kind(), err));
            }
        }
    }
}

/// Validated and quoted attempt, ready for account resolution
struct QuotedOrder {
    intent: OrderIntent,
    quote: Quote,
}

pub struct SwapSession {
    feed: Arc<MarketFeed>,
    client: Arc<dyn ChainClient>,
    signer: Arc<dyn TransactionSigner>,
    listener: Arc<dyn SwapListener>,
    guards: Arc<AttemptGuards>,
    resolver: AccountResolver,
    builder: TransactionBuilder,
    confirmer: ConfirmationReconciler,
    max_slots_consumed: usize,
    state: Mutex<SwapState>,
    request: Mutex<SwapRequest>,
}

impl SwapSession {
    pub fn new(
        feed: Arc<MarketFeed>,
        client: Arc<dyn ChainClient>,
        signer: Arc<dyn TransactionSigner>,
        listener: Arc<dyn SwapListener>,
        guards: Arc<AttemptGuards>,
        settings: SessionSettings,
    ) -> Self {
        let market_name = feed.details().name.clone();
        Self {
            resolver: AccountResolver::new(client.clone(), settings.wrap_buffer_lamports),
            builder: TransactionBuilder::new(settings.freshness_band),
            confirmer: ConfirmationReconciler::new(client.clone(), settings.confirmation),
            max_slots_consumed: settings.max_slots_consumed,
            state: Mutex::new(SwapState::Idle),
            request: Mutex::new(SwapRequest::new(Side::Buy, &market_name, "")),
            feed,
            client,
            signer,
            listener,
            guards,
        }
    }

    pub fn market(&self) -> &Arc<MarketDetails> {
        self.feed.details()
    }

    pub fn state(&self) -> SwapState {
        *self.state.lock()
    }

    pub fn request(&self) -> SwapRequest {
        self.request.lock().clone()
    }

    /// Quote `input` against the current snapshot and remember it as the
    /// session's request
    pub fn quote(&self, side: Side, input: &str) -> Quote {
        let snapshot = self.feed.snapshot();
        let quote = compute_quote(&snapshot, side, parse_amount(input), self.market().swap_margin);

        let mut request = self.request.lock();
        request.side = side;
        request.input_amount = input.trim().to_string();
        request.output_amount = quote.output_amount;
        request.slots_consumed = quote.slots_consumed;
        quote
    }

    /// Flip buy/sell, carrying the last output into the new input
    pub fn switch_side(&self) -> SwapRequest {
        let (side, carried) = {
            let request = self.request.lock();
            (request.side.opposite(), format_amount(request.output_amount, 2))
        };
        self.quote(side, &carried);
        self.request()
    }

    /// Manual mode: validate, quote and build without signing or submitting
    pub async fn prepare(&self, side: Side, input: &str) -> Result<TransactionPlan, SwapError> {
        let result = self.build_plan(side, input).await;
        self.set_state(SwapState::Idle);
        result
    }

    /// Run one full attempt. The listener gets exactly one terminal event.
    pub async fn execute(&self, side: Side, input: &str) -> ExecutionResult {
        let result = self.run_attempt(side, input).await;

        match &result {
            Ok(outcome) => {
                self.set_state(SwapState::Succeeded);
                self.listener.on_event(&SwapEvent::Succeeded(outcome.clone()));
            }
            Err(err) => {
                self.set_state(SwapState::Failed);
                self.listener.on_event(&SwapEvent::Failed(err.clone()));
            }
        }
        result
    }

    async fn run_attempt(&self, side: Side, input: &str) -> ExecutionResult {
        let market = self.market().clone();
        let owner = self.signer.pubkey();
        let _slots = self
            .guards
            .acquire(&owner, &[market.base.mint, market.quote.mint])
            .await;

        let plan = self.build_plan(side, input).await?;

        self.set_state(SwapState::AwaitingSignature);
        let blockhash = self.client.get_latest_blockhash().await?;
        let mut transaction = plan.to_transaction(blockhash)?;
        self.signer.sign_transaction(&mut transaction).await?;

        let signature = self.client.send_transaction(&transaction).await?;
        self.set_state(SwapState::Submitted);
        logger::info(
            LogTag::Swap,
            &format!(
                "📤 Submitted {} {} {} @ {:.10}: {}",
                side, plan.size, market.base.name, plan.limit_price, signature
            ),
        );
        self.listener.on_event(&SwapEvent::AwaitingConfirmation {
            signature: signature.clone(),
        });

        self.set_state(SwapState::Confirming);
        self.confirmer.confirm(&signature, &owner, &market).await
    }

    async fn build_plan(&self, side: Side, input: &str) -> Result<TransactionPlan, SwapError> {
        let market = self.market().clone();

        self.set_state(SwapState::Validating);
        let snapshot = self.feed.snapshot();
        let amount = self.validate(side, input, &snapshot).await?;

        self.set_state(SwapState::Quoting);
        let order = self.quote_order(side, amount, &snapshot)?;
        logger::debug(
            LogTag::Quote,
            &format!(
                "{} {} -> {} over {} level(s)",
                side, amount, order.quote.output_amount, order.quote.slots_consumed
            ),
        );

        self.set_state(SwapState::BuildingAccounts);
        let limit_price = order.intent.limit_price(market.swap_margin);
        let wrap = WrapLamports::for_order(side, &market, limit_price, order.intent.size);
        let resolution = self.resolver.resolve(&order.intent.owner, &market, wrap).await?;

        self.set_state(SwapState::BuildingTransaction);
        let live = self.feed.fetch_live().await?;
        self.builder.build(&order.intent, &market, resolution, &live)
    }

    async fn validate(&self, side: Side, input: &str, snapshot: &OrderBookSnapshot) -> Result<f64, SwapError> {
        let market = self.market();
        let amount = parse_amount(input);
        if amount <= 0.0 {
            return Err(SwapError::validation("amount", "must be greater than zero"));
        }
        if side == Side::Sell && amount < market.min_base {
            return Err(below_minimum(market));
        }
        if !snapshot.has_top_of_book() {
            return Err(SwapError::unavailable("market-info", "no bid or ask available"));
        }

        let paying = match side {
            Side::Buy => &market.quote,
            Side::Sell => &market.base,
        };
        let balance = get_token_balance(self.client.as_ref(), &self.signer.pubkey(), paying).await?;
        if balance < amount {
            return Err(SwapError::validation(
                "balance",
                format!("insufficient {}: have {}, need {}", paying.name, balance, amount),
            ));
        }
        Ok(amount)
    }

    fn quote_order(&self, side: Side, amount: f64, snapshot: &OrderBookSnapshot) -> Result<QuotedOrder, SwapError> {
        let market = self.market();
        let quote = compute_quote(snapshot, side, amount, market.swap_margin);

        if quote.slots_consumed == 0 {
            return Err(SwapError::unavailable("market-info", "order book has no depth"));
        }
        if quote.capped {
            return Err(SwapError::validation(
                "amount",
                format!("exceeds available depth, at most {} can be filled", quote.consumed_input),
            ));
        }
        if quote.slots_consumed > self.max_slots_consumed {
            return Err(SwapError::validation(
                "amount",
                format!(
                    "order would fill across {} price levels, reduce the amount",
                    quote.slots_consumed
                ),
            ));
        }

        let (reference_price, size) = match side {
            Side::Buy => (snapshot.lowest_ask(), quote.output_amount),
            Side::Sell => (snapshot.highest_bid(), amount),
        };
        if side == Side::Buy && size < market.min_base {
            return Err(below_minimum(market));
        }

        Ok(QuotedOrder {
            intent: OrderIntent {
                owner: self.signer.pubkey(),
                side,
                reference_price,
                size,
            },
            quote,
        })
    }

    fn set_state(&self, state: SwapState) {
        let mut current = self.state.lock();
        if *current != state {
            *current = state;
            drop(current);
            self.listener.on_event(&SwapEvent::StateChanged(state));
        }
    }
}

fn below_minimum(market: &MarketDetails) -> SwapError {
    SwapError::validation(
        "amount",
        format!("below the market minimum of {} {}", market.min_base, market.base.name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::slab::fixtures::slab_bytes;
    use crate::market::details::fixtures::sample_details;
    use crate::market::{FeedSettings, OnChainSource, RefreshLocks};
    use crate::rpc::mock::MockChain;
    use crate::rpc::KeypairSigner;
    use crate::swaps::confirmation::fixtures::{landed, token_balance};
    use solana_sdk::signature::{Keypair, Signer};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<SwapEvent>>,
    }

    impl SwapListener for Recorder {
        fn on_event(&self, event: &SwapEvent) {
            self.events.lock().push(event.clone());
        }
    }

    impl Recorder {
        fn terminal(&self) -> Vec<SwapEvent> {
            self.events.lock().iter().filter(|e| e.is_terminal()).cloned().collect()
        }
    }

    struct Harness {
        chain: Arc<MockChain>,
        session: SwapSession,
        recorder: Arc<Recorder>,
        owner: Keypair,
        market: Arc<MarketDetails>,
    }

    /// BONK/SOL market; price lots of 1000 are 0.001 SOL, 1000 qty lots are 1 BONK
    async fn harness(bids: &[(u64, u64)], asks: &[(u64, u64)]) -> Harness {
        let market = Arc::new(sample_details(true));
        let chain = Arc::new(MockChain::new());
        chain.set_account(market.layout.bids, slab_bytes(bids));
        chain.set_account(market.layout.asks, slab_bytes(asks));

        let feed = Arc::new(MarketFeed::new(
            market.clone(),
            Arc::new(OnChainSource::new(chain.clone())),
            None,
            FeedSettings {
                refresh_interval: Duration::from_secs(2),
                onchain_every_ticks: 15,
                stale_alert_minutes: 61,
                max_spread: 0.10,
            },
            &RefreshLocks::new(),
        ));
        feed.refresh().await.unwrap();

        let owner = Keypair::new();
        let recorder = Arc::new(Recorder::default());
        let session = SwapSession::new(
            feed,
            chain.clone(),
            Arc::new(KeypairSigner::new(owner.insecure_clone())),
            recorder.clone(),
            Arc::new(AttemptGuards::new()),
            SessionSettings::default(),
        );

        Harness {
            chain,
            session,
            recorder,
            owner,
            market,
        }
    }

    #[tokio::test]
    async fn test_sell_runs_to_success() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;
        let owner = h.owner.pubkey();
        h.chain.add_token_account(owner, h.market.base.mint, 500.0);
        h.chain.add_open_orders(h.market.address, owner);
        *h.chain.fallback_transaction.lock() = Some(landed(
            1_000_000_000,
            1_090_000_000,
            vec![token_balance(&owner, &h.market.base.mint, 500.0)],
            vec![token_balance(&owner, &h.market.base.mint, 400.0)],
        ));

        let outcome = h.session.execute(Side::Sell, "100").await.unwrap();
        assert_eq!(outcome.delta(&h.market.base.mint), Some(-100.0));
        assert_eq!(h.session.state(), SwapState::Succeeded);

        let submitted = h.chain.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].is_signed());
        drop(submitted);

        let events = h.recorder.events.lock().clone();
        let awaiting = events
            .iter()
            .position(|e| matches!(e, SwapEvent::AwaitingConfirmation { .. }))
            .unwrap();
        let confirming = events
            .iter()
            .position(|e| *e == SwapEvent::StateChanged(SwapState::Confirming))
            .unwrap();
        assert!(awaiting < confirming);
        assert_eq!(h.recorder.terminal().len(), 1);
        assert!(matches!(events.last(), Some(SwapEvent::Succeeded(_))));
    }

    #[tokio::test]
    async fn test_submit_failure_fails_once() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;
        let owner = h.owner.pubkey();
        h.chain.add_token_account(owner, h.market.base.mint, 500.0);
        h.chain.add_open_orders(h.market.address, owner);
        *h.chain.send_error.lock() = Some(SwapError::Network("connection reset".into()));

        let err = h.session.execute(Side::Sell, "100").await.unwrap_err();
        assert_eq!(err, SwapError::Network("connection reset".into()));
        assert_eq!(h.session.state(), SwapState::Failed);
        assert_eq!(h.recorder.terminal(), vec![SwapEvent::Failed(err)]);

        let events = h.recorder.events.lock().clone();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SwapEvent::AwaitingConfirmation { .. })));
        assert!(!events.contains(&SwapEvent::StateChanged(SwapState::Submitted)));
        assert_eq!(*h.chain.transaction_queries.lock(), 0);
    }

    #[tokio::test]
    async fn test_preflight_insufficient_funds_translated() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;
        let owner = h.owner.pubkey();
        h.chain.add_token_account(owner, h.market.base.mint, 500.0);
        h.chain.add_open_orders(h.market.address, owner);
        *h.chain.send_error.lock() = Some(crate::rpc::rpc_error(
            "sendTransaction",
            &serde_json::json!({
                "code": -32002,
                "message": "Transaction simulation failed: Error processing Instruction 2: custom program error: 0x1",
                "data": {"err": {"InstructionError": [2, {"Custom": 1}]}}
            }),
        ));

        let err = h.session.execute(Side::Sell, "100").await.unwrap_err();
        match &err {
            SwapError::Execution { reason, .. } => assert_eq!(reason, "Insufficient funds."),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.recorder.terminal(), vec![SwapEvent::Failed(err)]);
    }

    #[tokio::test]
    async fn test_zero_amount_fails_without_submission() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;

        let err = h.session.execute(Side::Sell, "abc").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(h.chain.submitted.lock().is_empty());
        assert_eq!(h.recorder.terminal(), vec![SwapEvent::Failed(err)]);
        assert_eq!(h.session.state(), SwapState::Failed);
    }

    #[tokio::test]
    async fn test_insufficient_balance_refused() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;
        h.chain.add_token_account(h.owner.pubkey(), h.market.base.mint, 50.0);

        let err = h.session.execute(Side::Sell, "100").await.unwrap_err();
        match err {
            SwapError::Validation { field, .. } => assert_eq!(field, "balance"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fragmented_fill_refused() {
        let h = harness(&[(1000, 5_000_000), (990, 5_000_000)], &[(1010, 5_000_000)]).await;
        h.chain.add_token_account(h.owner.pubkey(), h.market.base.mint, 10_000.0);

        let err = h.session.execute(Side::Sell, "6000").await.unwrap_err();
        assert!(err.to_string().contains("2 price levels"));
        assert!(h.chain.submitted.lock().is_empty());
        assert_eq!(h.recorder.terminal().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_exchanged_is_slippage() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;
        let owner = h.owner.pubkey();
        h.chain.add_token_account(owner, h.market.base.mint, 500.0);
        *h.chain.fallback_transaction.lock() = Some(landed(
            1_000_000_000,
            1_000_000_000,
            vec![token_balance(&owner, &h.market.base.mint, 500.0)],
            vec![token_balance(&owner, &h.market.base.mint, 500.0)],
        ));

        let err = h.session.execute(Side::Sell, "100").await.unwrap_err();
        assert_eq!(err.kind(), "slippage-boundary");
        assert_eq!(h.recorder.terminal().len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_returns_unsigned_plan() {
        let h = harness(&[(1000, 5_000_000)], &[(1000, 5_000_000)]).await;
        h.chain.set_balance(h.owner.pubkey(), 5_000_000_000);

        // 1 SOL at 0.001 buys 1000 BONK, the step keeps 0 after margin
        let err = h.session.prepare(Side::Buy, "1").await.unwrap_err();
        assert_eq!(err.kind(), "validation");

        let plan = h.session.prepare(Side::Buy, "2.5").await.unwrap();
        assert_eq!(plan.size, 2_000.0);
        assert!(plan.is_new_order_account);
        assert!(h.chain.submitted.lock().is_empty());
        assert_eq!(h.session.state(), SwapState::Idle);
        assert!(h.recorder.terminal().is_empty());
    }

    #[tokio::test]
    async fn test_switch_side_carries_output() {
        let h = harness(&[(1000, 5_000_000)], &[(1010, 5_000_000)]).await;

        let quote = h.session.quote(Side::Sell, "100");
        assert_eq!(quote.slots_consumed, 1);

        let request = h.session.switch_side();
        assert_eq!(request.side, Side::Buy);
        assert_eq!(request.input_amount, "0.10");
    }
}
