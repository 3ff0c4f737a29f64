/// In-memory chain used by unit tests
use super::{ChainClient, SignatureStatus, TokenAccountInfo, TransactionDetails};
use crate::errors::SwapError;
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::Transaction};
use std::collections::HashMap;

#[derive(Default)]
pub struct MockChain {
    pub token_accounts: Mutex<HashMap<(Pubkey, Pubkey), Vec<TokenAccountInfo>>>,
    pub open_orders: Mutex<HashMap<(Pubkey, Pubkey), Vec<Pubkey>>>,
    pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub balances: Mutex<HashMap<Pubkey, u64>>,
    pub transactions: Mutex<HashMap<String, TransactionDetails>>,
    /// getTransaction returns None this many times before the stored details
    pub pending_polls: Mutex<usize>,
    /// getTransaction fails with a network error this many times first
    pub transient_failures: Mutex<usize>,
    /// getTransaction returns these errors, in order, before anything else
    pub poll_errors: Mutex<Vec<SwapError>>,
    /// Every read fails while set
    pub reads_fail: Mutex<bool>,
    pub submitted: Mutex<Vec<Transaction>>,
    pub send_error: Mutex<Option<SwapError>>,
    pub transaction_queries: Mutex<usize>,
    /// Returned for any signature without stored details
    pub fallback_transaction: Mutex<Option<TransactionDetails>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token_account(&self, owner: Pubkey, mint: Pubkey, ui_amount: f64) -> Pubkey {
        let address = Pubkey::new_unique();
        self.token_accounts
            .lock()
            .entry((owner, mint))
            .or_default()
            .push(TokenAccountInfo {
                address,
                mint,
                amount: (ui_amount * 1_000_000.0) as u64,
                ui_amount,
            });
        address
    }

    pub fn add_open_orders(&self, market: Pubkey, owner: Pubkey) -> Pubkey {
        let address = Pubkey::new_unique();
        self.open_orders
            .lock()
            .entry((market, owner))
            .or_default()
            .push(address);
        address
    }

    pub fn set_balance(&self, owner: Pubkey, lamports: u64) {
        self.balances.lock().insert(owner, lamports);
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().insert(address, data);
    }

    pub fn set_transaction(&self, signature: &str, details: TransactionDetails) {
        self.transactions
            .lock()
            .insert(signature.to_string(), details);
    }

    fn check_reads(&self) -> Result<(), SwapError> {
        if *self.reads_fail.lock() {
            return Err(SwapError::Network("mock read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountInfo>, SwapError> {
        self.check_reads()?;
        Ok(self
            .token_accounts
            .lock()
            .get(&(*owner, *mint))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_open_orders_accounts(
        &self,
        _program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, SwapError> {
        self.check_reads()?;
        Ok(self
            .open_orders
            .lock()
            .get(&(*market, *owner))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, SwapError> {
        self.check_reads()?;
        Ok(self.accounts.lock().get(address).cloned())
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, SwapError> {
        self.check_reads()?;
        Ok(self.balances.lock().get(owner).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, SwapError> {
        Ok(Hash::new_from_array([7u8; 32]))
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionDetails>, SwapError> {
        *self.transaction_queries.lock() += 1;

        {
            let mut errors = self.poll_errors.lock();
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }

        {
            let mut failures = self.transient_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(SwapError::Network("mock connection reset".into()));
            }
        }
        {
            let mut pending = self.pending_polls.lock();
            if *pending > 0 {
                *pending -= 1;
                return Ok(None);
            }
        }

        Ok(self
            .transactions
            .lock()
            .get(signature)
            .cloned()
            .or_else(|| self.fallback_transaction.lock().clone()))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, SwapError> {
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push(transaction.clone());
        Ok(transaction
            .signatures
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default())
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, SwapError> {
        Ok(self
            .transactions
            .lock()
            .get(signature)
            .map(|details| SignatureStatus {
                slot: details.slot,
                confirmation_status: Some("confirmed".to_string()),
                err: details.meta.as_ref().and_then(|m| m.err.clone()),
            }))
    }
}
