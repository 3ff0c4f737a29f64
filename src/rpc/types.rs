/// Wire types returned by the Solana JSON-RPC API
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Parsed transaction returned by getTransaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub slot: u64,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
}

/// Transaction metadata with balance changes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(rename = "preBalances", default)]
    pub pre_balances: Vec<u64>,
    #[serde(rename = "postBalances", default)]
    pub post_balances: Vec<u64>,
    #[serde(rename = "preTokenBalances", default)]
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    #[serde(rename = "postTokenBalances", default)]
    pub post_token_balances: Option<Vec<TokenBalance>>,
    #[serde(default)]
    pub fee: u64,
    #[serde(rename = "logMessages", default)]
    pub log_messages: Option<Vec<String>>,
}

/// Token balance information in transaction metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    #[serde(rename = "accountIndex")]
    pub account_index: u32,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(rename = "uiTokenAmount")]
    pub ui_token_amount: UiTokenAmount,
}

/// Token amount with UI representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(rename = "uiAmount", default)]
    pub ui_amount: Option<f64>,
}

/// SPL token account owned by a wallet
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountInfo {
    pub address: Pubkey,
    pub mint: Pubkey,
    /// Raw amount in base units
    pub amount: u64,
    pub ui_amount: f64,
}

/// Result of getSignatureStatuses for one signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureStatus {
    #[serde(default)]
    pub slot: u64,
    #[serde(rename = "confirmationStatus", default)]
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_details_from_rpc_json() {
        let value = json!({
            "slot": 245_000_001u64,
            "blockTime": 1_700_000_000i64,
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [2_000_000_000u64, 0],
                "postBalances": [1_500_000_000u64, 0],
                "preTokenBalances": [],
                "postTokenBalances": [{
                    "accountIndex": 3,
                    "mint": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
                    "owner": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
                    "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                    "uiTokenAmount": {"amount": "50000", "decimals": 5, "uiAmount": 0.5, "uiAmountString": "0.5"}
                }],
                "logMessages": []
            },
            "transaction": {"signatures": ["abc"], "message": {}}
        });

        let details: TransactionDetails = serde_json::from_value(value).unwrap();
        let meta = details.meta.unwrap();
        assert!(meta.err.is_none());
        assert_eq!(meta.pre_balances[0], 2_000_000_000);
        let post = meta.post_token_balances.unwrap();
        assert_eq!(post[0].ui_token_amount.ui_amount, Some(0.5));
    }

    #[test]
    fn test_signature_status_confirmation() {
        let status: SignatureStatus =
            serde_json::from_value(json!({"slot": 1, "confirmationStatus": "processed", "err": null}))
                .unwrap();
        assert!(!status.is_confirmed());
    }
}
