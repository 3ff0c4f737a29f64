/// Confirmation: poll a submitted transaction and turn its metadata into an outcome
///
/// Polling is bounded. A transaction that is not yet visible is polled on a
/// fixed interval, transient read errors back off exponentially, and the
/// whole wait gives up after the configured timeout.
use super::types::{ExecutionResult, SwapOutcome};
use crate::config::with_config;
use crate::errors::{is_permanent_failure, is_temporary_failure, parse_transaction_error, SwapError};
use crate::logger::{self, LogTag};
use crate::market::MarketDetails;
use crate::rpc::{ChainClient, TokenBalance, TransactionDetails, TransactionMeta};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone)]
pub struct ConfirmationSettings {
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl ConfirmationSettings {
    pub fn from_config() -> Self {
        with_config(|cfg| Self {
            poll_interval: Duration::from_millis(cfg.swap.poll_interval_ms),
            max_backoff: Duration::from_millis(cfg.swap.max_backoff_ms),
            timeout: Duration::from_secs(cfg.swap.confirmation_timeout_secs),
        })
    }
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            timeout: Duration::from_secs(90),
        }
    }
}

pub struct ConfirmationReconciler {
    client: Arc<dyn ChainClient>,
    settings: ConfirmationSettings,
}

impl ConfirmationReconciler {
    pub fn new(client: Arc<dyn ChainClient>, settings: ConfirmationSettings) -> Self {
        Self { client, settings }
    }

    pub async fn confirm(&self, signature: &str, owner: &Pubkey, market: &MarketDetails) -> ExecutionResult {
        let details = self.wait_for_transaction(signature).await?;
        reconcile_transaction(signature, owner, market, &details)
    }

    async fn wait_for_transaction(&self, signature: &str) -> Result<TransactionDetails, SwapError> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;
        let mut backoff = self.settings.poll_interval;
        let mut polls = 0u32;

        loop {
            polls += 1;
            let wait = match self.client.get_transaction(signature).await {
                Ok(Some(details)) => {
                    logger::debug(
                        LogTag::Confirm,
                        &format!(
                            "Transaction {} visible after {} polls ({:.1}s)",
                            signature,
                            polls,
                            started.elapsed().as_secs_f64()
                        ),
                    );
                    return Ok(details);
                }
                Ok(None) => {
                    self.check_landed_failure(signature).await?;
                    backoff = self.settings.poll_interval;
                    self.settings.poll_interval
                }
                Err(e) if e.is_transient() => {
                    logger::warning(
                        LogTag::Confirm,
                        &format!("Polling {} failed, retrying in {}ms: {}", signature, backoff.as_millis(), e),
                    );
                    let wait = backoff;
                    backoff = (backoff * 2).min(self.settings.max_backoff);
                    wait
                }
                Err(e) => return Err(e),
            };

            let now = Instant::now();
            if now >= deadline {
                logger::warning(
                    LogTag::Confirm,
                    &format!("Gave up on {} after {} polls", signature, polls),
                );
                return Err(SwapError::ConfirmationTimedOut {
                    signature: signature.to_string(),
                    waited_secs: self.settings.timeout.as_secs(),
                });
            }
            sleep_until((now + wait).min(deadline)).await;
        }
    }

    /// A signature status can report a failure before the full transaction is
    /// queryable; permanent failures end the wait early.
    async fn check_landed_failure(&self, signature: &str) -> Result<(), SwapError> {
        let status = match self.client.get_signature_status(signature).await {
            Ok(Some(status)) => status,
            Ok(None) => return Ok(()),
            Err(e) => {
                logger::debug(LogTag::Confirm, &format!("Status lookup for {} failed: {}", signature, e));
                return Ok(());
            }
        };

        match status.err.as_ref().map(parse_transaction_error) {
            Some(parsed) if is_permanent_failure(&parsed) => Err(SwapError::Execution {
                signature: signature.to_string(),
                reason: parsed.user_message(),
            }),
            Some(parsed) if is_temporary_failure(&parsed) => {
                logger::debug(
                    LogTag::Confirm,
                    &format!("{} reported {}, still waiting", signature, parsed.error_name),
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Turn landed transaction metadata into an outcome for the tracked mints
pub fn reconcile_transaction(
    signature: &str,
    owner: &Pubkey,
    market: &MarketDetails,
    details: &TransactionDetails,
) -> ExecutionResult {
    let meta = details
        .meta
        .as_ref()
        .ok_or_else(|| SwapError::unavailable("transaction", "metadata missing"))?;

    if let Some(err) = &meta.err {
        let parsed = parse_transaction_error(err);
        logger::error(
            LogTag::Confirm,
            &format!("Transaction {} failed: {} ({})", signature, parsed.error_name, parsed.raw_error),
        );
        return Err(SwapError::Execution {
            signature: signature.to_string(),
            reason: parsed.user_message(),
        });
    }

    let mut deltas = HashMap::new();
    for token in [&market.base, &market.quote] {
        let delta = if token.is_native() {
            native_delta(meta)
        } else {
            token_delta(meta, owner, &token.mint)
        };
        if let Some(delta) = delta {
            deltas.insert(token.mint.to_string(), delta);
        }
    }

    let base_delta = deltas.get(&market.base.mint.to_string());
    let quote_delta = deltas.get(&market.quote.mint.to_string());
    if let (Some(base), Some(quote)) = (base_delta, quote_delta) {
        if *base == 0.0 && *quote == 0.0 {
            return Err(SwapError::SlippageBoundary {
                signature: signature.to_string(),
            });
        }
    }

    logger::info(
        LogTag::Confirm,
        &format!(
            "Confirmed {}: {} {:+}, {} {:+}",
            signature,
            market.base.name,
            base_delta.copied().unwrap_or(0.0),
            market.quote.name,
            quote_delta.copied().unwrap_or(0.0)
        ),
    );

    Ok(SwapOutcome {
        signature: signature.to_string(),
        deltas,
    })
}

/// Change of the fee payer's native balance in SOL
fn native_delta(meta: &TransactionMeta) -> Option<f64> {
    let pre = *meta.pre_balances.first()?;
    let post = *meta.post_balances.first()?;
    Some((post as i128 - pre as i128) as f64 / 1e9)
}

fn token_delta(meta: &TransactionMeta, owner: &Pubkey, mint: &Pubkey) -> Option<f64> {
    let find = |balances: &Option<Vec<TokenBalance>>| {
        balances.as_ref().and_then(|list| {
            list.iter()
                .find(|b| b.mint == mint.to_string() && b.owner.as_deref() == Some(owner.to_string().as_str()))
                .map(ui_amount)
        })
    };
    balance_delta(find(&meta.pre_token_balances), find(&meta.post_token_balances))
}

fn ui_amount(balance: &TokenBalance) -> f64 {
    balance.ui_token_amount.ui_amount.unwrap_or_else(|| {
        balance
            .ui_token_amount
            .amount
            .parse::<f64>()
            .map(|raw| raw / 10f64.powi(balance.ui_token_amount.decimals as i32))
            .unwrap_or(0.0)
    })
}

/// Delta rules: both present -> difference, post only -> post,
/// pre only -> -pre, neither -> nothing
pub fn balance_delta(pre: Option<f64>, post: Option<f64>) -> Option<f64> {
    match (pre, post) {
        (Some(pre), Some(post)) => Some(post - pre),
        (None, Some(post)) => Some(post),
        (Some(pre), None) => Some(-pre),
        (None, None) => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::market::details::fixtures::sample_details;
    use crate::rpc::mock::MockChain;
    use crate::rpc::rpc_error;
    use serde_json::json;

    #[test]
    fn test_balance_delta_rules() {
        assert_eq!(balance_delta(None, Some(50.0)), Some(50.0));
        assert_eq!(balance_delta(Some(50.0), None), Some(-50.0));
        assert_eq!(balance_delta(Some(30.0), Some(45.0)), Some(15.0));
        assert_eq!(balance_delta(None, None), None);
    }

    #[test]
    fn test_zero_deltas_hit_slippage_boundary() {
        let market = sample_details(false);
        let owner = Pubkey::new_unique();
        let details = landed(
            1_000,
            995,
            vec![
                token_balance(&owner, &market.base.mint, 10.0),
                token_balance(&owner, &market.quote.mint, 5.0),
            ],
            vec![
                token_balance(&owner, &market.base.mint, 10.0),
                token_balance(&owner, &market.quote.mint, 5.0),
            ],
        );

        let err = reconcile_transaction("sig", &owner, &market, &details).unwrap_err();
        assert_eq!(
            err,
            SwapError::SlippageBoundary {
                signature: "sig".into()
            }
        );
    }

    #[test]
    fn test_native_and_token_deltas() {
        let market = sample_details(true);
        let owner = Pubkey::new_unique();
        let stranger = Pubkey::new_unique();
        let details = landed(
            3_000_000_000,
            2_500_000_000,
            vec![token_balance(&stranger, &market.base.mint, 99.0)],
            vec![
                token_balance(&owner, &market.base.mint, 1_000.0),
                token_balance(&stranger, &market.base.mint, 98.0),
            ],
        );

        let outcome = reconcile_transaction("sig", &owner, &market, &details).unwrap();
        assert_eq!(outcome.delta(&market.base.mint), Some(1_000.0));
        assert_eq!(outcome.delta(&market.quote.mint), Some(-0.5));
    }

    #[test]
    fn test_missing_token_entries_are_not_slippage() {
        let market = sample_details(false);
        let owner = Pubkey::new_unique();
        let details = landed(1_000, 1_000, vec![], vec![]);

        let outcome = reconcile_transaction("sig", &owner, &market, &details).unwrap();
        assert!(outcome.deltas.is_empty());
    }

    #[test]
    fn test_custom_error_translated() {
        let market = sample_details(false);
        let mut details = landed(1_000, 995, vec![], vec![]);
        if let Some(meta) = details.meta.as_mut() {
            meta.err = Some(json!({"InstructionError": [3, {"Custom": 34}]}));
        }

        let err = reconcile_transaction("sig", &Pubkey::new_unique(), &market, &details).unwrap_err();
        assert_eq!(
            err,
            SwapError::Execution {
                signature: "sig".into(),
                reason: "Insufficient funds.".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_visible_with_backoff() {
        let market = sample_details(true);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        *chain.transient_failures.lock() = 2;
        *chain.pending_polls.lock() = 3;
        chain.set_transaction("sig", landed(2_000_000_000, 1_000_000_000, vec![], vec![]));

        let reconciler = ConfirmationReconciler::new(chain.clone(), ConfirmationSettings::default());
        let started = Instant::now();
        let outcome = reconciler.confirm("sig", &owner, &market).await.unwrap();

        assert_eq!(outcome.delta(&market.quote.mint), Some(-1.0));
        assert_eq!(*chain.transaction_queries.lock(), 6);
        // 1s + 2s backoff, then three 1s polls
        assert_eq!(started.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_reported_lag_is_retried() {
        let market = sample_details(true);
        let owner = Pubkey::new_unique();
        let chain = Arc::new(MockChain::new());
        chain.poll_errors.lock().extend([
            rpc_error("getTransaction", &json!({"code": -32005, "message": "Node is behind by 42 slots"})),
            rpc_error("getTransaction", &json!({"code": -32004, "message": "Block not available for slot 9"})),
        ]);
        chain.set_transaction("sig", landed(2_000_000_000, 1_500_000_000, vec![], vec![]));

        let reconciler = ConfirmationReconciler::new(chain.clone(), ConfirmationSettings::default());
        let started = Instant::now();
        let outcome = reconciler.confirm("sig", &owner, &market).await.unwrap();

        assert_eq!(outcome.delta(&market.quote.mint), Some(-0.5));
        assert_eq!(*chain.transaction_queries.lock(), 3);
        // 1s then 2s backoff
        assert_eq!(started.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_ends_wait_early() {
        let market = sample_details(false);
        let chain = Arc::new(MockChain::new());
        *chain.pending_polls.lock() = usize::MAX;
        let mut details = landed(1_000, 995, vec![], vec![]);
        if let Some(meta) = details.meta.as_mut() {
            meta.err = Some(json!({"InstructionError": [2, {"Custom": 1}]}));
        }
        chain.set_transaction("sig", details);

        let reconciler = ConfirmationReconciler::new(chain.clone(), ConfirmationSettings::default());
        let err = reconciler
            .confirm("sig", &Pubkey::new_unique(), &market)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SwapError::Execution {
                signature: "sig".into(),
                reason: "Insufficient funds.".into()
            }
        );
        assert_eq!(*chain.transaction_queries.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_visible() {
        let market = sample_details(false);
        let chain = Arc::new(MockChain::new());
        *chain.pending_polls.lock() = usize::MAX;

        let settings = ConfirmationSettings {
            timeout: Duration::from_secs(10),
            ..ConfirmationSettings::default()
        };
        let reconciler = ConfirmationReconciler::new(chain.clone(), settings);
        let err = reconciler
            .confirm("sig", &Pubkey::new_unique(), &market)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SwapError::ConfirmationTimedOut {
                signature: "sig".into(),
                waited_secs: 10
            }
        );
        assert_eq!(*chain.transaction_queries.lock(), 11);
    }
}
