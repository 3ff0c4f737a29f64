/// Swap execution against OpenBook markets
///
/// - `quote`: order book walk and price accuracy grading
/// - `accounts`: token / open orders account resolution
/// - `instructions`: OpenBook v3 instruction encoders
/// - `transaction`: freshness check and transaction plan assembly
/// - `confirmation`: bounded polling and balance delta reconciliation
/// - `orchestrator`: the per-market swap session state machine
pub mod accounts;
pub mod confirmation;
pub mod guard;
pub mod instructions;
pub mod orchestrator;
pub mod quote;
pub mod transaction;
pub mod types;

pub use accounts::{AccountResolution, AccountResolver, OpenOrdersAccount, ResolvedAccount, WrapLamports};
pub use confirmation::{ConfirmationReconciler, ConfirmationSettings};
pub use guard::AttemptGuards;
pub use orchestrator::{LogListener, SessionSettings, SwapSession};
pub use quote::{compute_quote, price_accuracy, AccuracyGrade, PriceAccuracy};
pub use transaction::{OrderIntent, TransactionBuilder};
pub use types::*;
