/// Shared swap types: requests, quotes, plans, outcomes and lifecycle events
use crate::errors::SwapError;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Spend quote, receive base
    Buy,
    /// Spend base, receive quote
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked for, plus the last computed quote
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub side: Side,
    /// Market name or address
    pub market: String,
    /// Input amount exactly as entered
    pub input_amount: String,
    pub output_amount: f64,
    pub slots_consumed: usize,
}

impl SwapRequest {
    pub fn new(side: Side, market: &str, input_amount: &str) -> Self {
        Self {
            side,
            market: market.to_string(),
            input_amount: input_amount.trim().to_string(),
            output_amount: 0.0,
            slots_consumed: 0,
        }
    }
}

/// Result of walking the book for one request
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quote {
    pub output_amount: f64,
    /// Input that can actually be filled; lower than requested when capped
    pub consumed_input: f64,
    pub slots_consumed: usize,
    /// The book was exhausted before the input was
    pub capped: bool,
}

/// Instructions and extra signers for one swap attempt
#[derive(Debug)]
pub struct TransactionPlan {
    pub instructions: Vec<Instruction>,
    /// Freshly generated keys that must sign besides the owner
    pub signers: Vec<Keypair>,
    pub is_new_order_account: bool,
    pub fee_payer: Pubkey,
    /// Limit price after margin
    pub limit_price: f64,
    /// Base quantity ordered
    pub size: f64,
}

/// Successful execution: signature and per-mint balance changes in UI units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapOutcome {
    pub signature: String,
    pub deltas: HashMap<String, f64>,
}

impl SwapOutcome {
    pub fn delta(&self, mint: &Pubkey) -> Option<f64> {
        self.deltas.get(&mint.to_string()).copied()
    }
}

pub type ExecutionResult = Result<SwapOutcome, SwapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapState {
    Idle,
    Validating,
    Quoting,
    BuildingAccounts,
    BuildingTransaction,
    AwaitingSignature,
    Submitted,
    Confirming,
    Succeeded,
    Failed,
}

impl SwapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapState::Succeeded | SwapState::Failed)
    }
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapState::Idle => "idle",
            SwapState::Validating => "validating",
            SwapState::Quoting => "quoting",
            SwapState::BuildingAccounts => "building-accounts",
            SwapState::BuildingTransaction => "building-transaction",
            SwapState::AwaitingSignature => "awaiting-signature",
            SwapState::Submitted => "submitted",
            SwapState::Confirming => "confirming",
            SwapState::Succeeded => "succeeded",
            SwapState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Notifications emitted during one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SwapEvent {
    StateChanged(SwapState),
    /// Transaction submitted, waiting for the chain
    AwaitingConfirmation { signature: String },
    Succeeded(SwapOutcome),
    Failed(SwapError),
}

impl SwapEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapEvent::Succeeded(_) | SwapEvent::Failed(_))
    }
}

pub trait SwapListener: Send + Sync {
    fn on_event(&self, event: &SwapEvent);
}
