/// Error handling for the swap engine
///
/// Every failure surfaces as a `SwapError` value. The orchestrator turns each
/// attempt into exactly one terminal outcome carrying one of these.
pub mod chain;
pub use chain::*;

#[derive(Debug, Clone, PartialEq)]
pub enum SwapError {
    /// Zero or invalid amount, below minimum, insufficient balance, fragmented fill
    Validation { field: String, reason: String },

    /// Market info, accounts or prices could not be read
    DataUnavailable { what: String, reason: String },

    /// Live best price drifted outside the freshness band
    StaleQuote { quoted: f64, live: f64 },

    /// More than one candidate account where exactly one is expected
    AccountAmbiguity { kind: String, count: usize },

    /// Transaction landed with an on-chain error
    Execution { signature: String, reason: String },

    /// Transaction landed but nothing was exchanged
    SlippageBoundary { signature: String },

    /// Transaction never became visible within the confirmation window
    ConfirmationTimedOut { signature: String, waited_secs: u64 },

    Network(String),
    Signing(String),
    Config(String),
    Encoding(String),
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapError::Validation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            SwapError::DataUnavailable { what, reason } => {
                write!(f, "{} unavailable: {}", what, reason)
            }
            SwapError::StaleQuote { quoted, live } => write!(
                f,
                "Quote changed, please refresh (old quote {:.10} and new quote {:.10})",
                quoted, live
            ),
            SwapError::AccountAmbiguity { kind, count } => {
                write!(f, "Found {} {} accounts where one was expected", count, kind)
            }
            SwapError::Execution { signature, reason } => {
                write!(f, "Transaction {} failed: {}", signature, reason)
            }
            SwapError::SlippageBoundary { signature } => write!(
                f,
                "Transaction {} executed nothing: price moved past the slippage boundary",
                signature
            ),
            SwapError::ConfirmationTimedOut {
                signature,
                waited_secs,
            } => write!(
                f,
                "Transaction {} not confirmed after {}s",
                signature, waited_secs
            ),
            SwapError::Network(msg) => write!(f, "Network error: {}", msg),
            SwapError::Signing(msg) => write!(f, "Signing error: {}", msg),
            SwapError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SwapError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
        }
    }
}

impl std::error::Error for SwapError {}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<reqwest::Error> for SwapError {
    fn from(err: reqwest::Error) -> Self {
        SwapError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SwapError {
    fn from(err: serde_json::Error) -> Self {
        SwapError::Encoding(format!("JSON: {}", err))
    }
}

impl From<bincode::Error> for SwapError {
    fn from(err: bincode::Error) -> Self {
        SwapError::Encoding(format!("bincode: {}", err))
    }
}

impl From<std::io::Error> for SwapError {
    fn from(err: std::io::Error) -> Self {
        SwapError::Encoding(format!("IO: {}", err))
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl SwapError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SwapError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        SwapError::DataUnavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn ambiguity(kind: impl Into<String>, count: usize) -> Self {
        SwapError::AccountAmbiguity {
            kind: kind.into(),
            count,
        }
    }

    /// Transient errors are worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, SwapError::Network(_))
    }

    /// Short machine-friendly kind, used in logs and listener events
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::Validation { .. } => "validation",
            SwapError::DataUnavailable { .. } => "data-unavailable",
            SwapError::StaleQuote { .. } => "stale-quote",
            SwapError::AccountAmbiguity { .. } => "account-ambiguity",
            SwapError::Execution { .. } => "execution",
            SwapError::SlippageBoundary { .. } => "slippage-boundary",
            SwapError::ConfirmationTimedOut { .. } => "timed-out",
            SwapError::Network(_) => "network",
            SwapError::Signing(_) => "signing",
            SwapError::Config(_) => "config",
            SwapError::Encoding(_) => "encoding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SwapError::StaleQuote {
            quoted: 1.0,
            live: 1.1,
        };
        assert!(err.to_string().contains("1.1000000000"));

        let err = SwapError::validation("amount", "must be greater than zero");
        assert_eq!(err.to_string(), "Invalid amount: must be greater than zero");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_transient_classification() {
        assert!(SwapError::Network("reset".into()).is_transient());
        assert!(!SwapError::Signing("bad key".into()).is_transient());
    }
}
