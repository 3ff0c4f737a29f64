use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use openbook_swap::{
    apis::MarketApiClient,
    arguments,
    config::{self, with_config},
    logger::{self, LogTag},
    market::{
        load_market_details, ApiSource, FeedSettings, MarketDataSource, MarketFeed, OnChainSource,
        RefreshLocks,
    },
    rpc::{ChainClient, KeypairSigner, RpcClient, TransactionSigner},
    swaps::{compute_quote, price_accuracy, AttemptGuards, LogListener, SessionSettings, Side, SwapSession},
    utils::{format_amount, parse_amount},
    wallet::get_market_balances,
};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Swap tokens against OpenBook order books
#[derive(Parser, Debug)]
#[command(name = "openbook-swap", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = config::CONFIG_FILE_PATH)]
    config: String,

    /// Market name or address from the configured list
    #[arg(long, global = true, default_value = "BONK/USDC")]
    market: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote a swap against the current book
    Quote {
        #[arg(long)]
        side: String,
        #[arg(long)]
        amount: String,
    },
    /// Execute a swap
    Swap {
        #[arg(long)]
        side: String,
        #[arg(long)]
        amount: String,
        /// Build the transaction plan without signing or submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Show wallet balances for the market's tokens
    Balances,
    /// Follow the top of book on the refresh cadence
    Watch {
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },
}

/// Logger flags are read by the logger itself, clap never sees them
fn is_logger_flag(arg: &str) -> bool {
    arg.starts_with("--debug-") || matches!(arg, "--verbose" | "-v" | "--quiet" | "-q")
}

fn parse_side(text: &str) -> Result<Side> {
    Side::parse(text).ok_or_else(|| anyhow!("side must be 'buy' or 'sell', got '{}'", text))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = arguments::get_cmd_args()
        .into_iter()
        .filter(|arg| !is_logger_flag(arg))
        .collect();
    let cli = Cli::parse_from(args);

    if let Err(e) = config::load_config_from_path(&cli.config) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let log_file = with_config(|cfg| cfg.logging.file_enabled.then(|| cfg.logging.file_path.clone()));
    logger::init(log_file.as_deref());

    let debug_modes = arguments::get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(LogTag::System, &format!("Debug modes: {}", debug_modes.join(", ")));
    }

    let result = run(cli).await;
    if let Err(e) = &result {
        logger::error(LogTag::System, &format!("{:#}", e));
    }
    logger::flush();

    if result.is_err() {
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client: Arc<dyn ChainClient> = Arc::new(RpcClient::from_config()?);

    let (entry, program_id) = with_config(|cfg| {
        (
            cfg.markets.find(&cli.market).cloned(),
            cfg.markets.dex_program_id.clone(),
        )
    });
    let entry = entry.with_context(|| format!("market '{}' is not configured", cli.market))?;
    let program_id = Pubkey::from_str(&program_id).context("invalid markets.dex_program_id")?;

    let details = Arc::new(load_market_details(client.as_ref(), &entry, &program_id).await?);
    let api: Option<Arc<dyn MarketDataSource>> = MarketApiClient::from_config()?
        .map(|api| Arc::new(ApiSource::new(api)) as Arc<dyn MarketDataSource>);

    let feed = Arc::new(MarketFeed::new(
        details.clone(),
        Arc::new(OnChainSource::new(client.clone())),
        api,
        FeedSettings::from_config(),
        &RefreshLocks::new(),
    ));
    feed.refresh().await?;

    match cli.command {
        Command::Quote { side, amount } => {
            let side = parse_side(&side)?;
            let input = parse_amount(&amount);
            let quote = compute_quote(&feed.snapshot(), side, input, details.swap_margin);
            let (input_token, output_token) = match side {
                Side::Buy => (&details.quote, &details.base),
                Side::Sell => (&details.base, &details.quote),
            };

            println!(
                "{} {} {} -> {} {} ({} level{}{})",
                side,
                amount,
                input_token.name,
                format_amount(quote.output_amount, output_token.decimals as usize),
                output_token.name,
                quote.slots_consumed,
                if quote.slots_consumed == 1 { "" } else { "s" },
                if quote.capped {
                    format!(", capped at {}", quote.consumed_input)
                } else {
                    String::new()
                }
            );

            let prices = feed.token_prices();
            if let (Some(price_in), Some(price_out)) =
                (prices.get(&input_token.name), prices.get(&output_token.name))
            {
                if let Some(accuracy) = price_accuracy(input, *price_in, quote.output_amount, *price_out) {
                    println!("Price accuracy: {} ({:+.2}%)", accuracy.grade, accuracy.percent);
                }
            }

            for alert in feed.alerts() {
                println!("⚠️  {}", alert);
            }
        }

        Command::Swap { side, amount, dry_run } => {
            let side = parse_side(&side)?;
            let session = open_session(&feed, &client)?;

            if dry_run || arguments::is_dry_run_enabled() {
                let plan = session.prepare(side, &amount).await?;
                println!(
                    "Dry run: {} {} {} @ {:.10}, {} instructions, {} extra signers{}",
                    side,
                    plan.size,
                    details.base.name,
                    plan.limit_price,
                    plan.instructions.len(),
                    plan.signers.len(),
                    if plan.is_new_order_account { ", creates open orders account" } else { "" }
                );
                return Ok(());
            }

            let outcome = session.execute(side, &amount).await?;
            println!("Signature: {}", outcome.signature);
            for token in [&details.base, &details.quote] {
                if let Some(delta) = outcome.delta(&token.mint) {
                    println!("  {} {:+}", token.name, delta);
                }
            }
        }

        Command::Balances => {
            let owner = config::get_wallet_pubkey().map_err(anyhow::Error::msg)?;
            let balances = get_market_balances(client.as_ref(), &owner, &details).await?;
            println!("Wallet {}", owner);
            println!("  {}: {}", details.base.name, balances.base);
            println!("  {}: {}", details.quote.name, balances.quote);
        }

        Command::Watch { count } => {
            let interval = FeedSettings::from_config().refresh_interval;
            let mut task = feed.start();
            let mut printed = 0u64;

            loop {
                let snapshot = feed.snapshot();
                println!(
                    "{} bid {:.10} ({}) | ask {:.10} ({}){}",
                    details.name,
                    snapshot.highest_bid(),
                    snapshot.highest_bid_quantity(),
                    snapshot.lowest_ask(),
                    snapshot.lowest_ask_quantity(),
                    if feed.is_on_chain_mode() { " [on-chain]" } else { "" }
                );
                for alert in feed.alerts() {
                    println!("⚠️  {}", alert);
                }

                printed += 1;
                if count.map(|limit| printed >= limit).unwrap_or(false) {
                    break;
                }
                tokio::time::sleep(interval.max(Duration::from_millis(500))).await;
            }

            task.cancel();
        }
    }

    Ok(())
}

fn open_session(feed: &Arc<MarketFeed>, client: &Arc<dyn ChainClient>) -> Result<SwapSession> {
    let keypair = config::get_wallet_keypair().map_err(anyhow::Error::msg)?;
    let signer: Arc<dyn TransactionSigner> = Arc::new(KeypairSigner::new(keypair));
    Ok(SwapSession::new(
        feed.clone(),
        client.clone(),
        signer,
        Arc::new(LogListener),
        Arc::new(AttemptGuards::new()),
        SessionSettings::from_config(),
    ))
}
