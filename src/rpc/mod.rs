/// Chain access for the swap engine
///
/// `ChainClient` is the narrow capability the engine needs from a Solana
/// node. `RpcClient` implements it over JSON-RPC with reqwest; tests use the
/// in-memory `mock::MockChain`.
pub mod types;

#[cfg(test)]
pub mod mock;

pub use types::*;

use crate::config::with_config;
use crate::errors::{parse_transaction_error, SwapError};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use std::time::Duration;

/// Read and submit operations the engine performs against the chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// SPL token accounts owned by `owner` for `mint`
    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountInfo>, SwapError>;

    /// Open orders accounts of `owner` on `market`
    async fn get_open_orders_accounts(
        &self,
        program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, SwapError>;

    /// Raw account data, `None` when the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, SwapError>;

    /// Native balance in lamports
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, SwapError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, SwapError>;

    /// Parsed transaction, `None` while it is not yet visible
    async fn get_transaction(&self, signature: &str)
        -> Result<Option<TransactionDetails>, SwapError>;

    /// Submit a fully signed transaction, returning its signature
    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, SwapError>;

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, SwapError>;
}

/// Wallet capability: adds the owner's signature to a transaction
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Add the owner signature; other required signatures are already present
    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SwapError>;
}

/// Signs with a local keypair loaded from config
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SwapError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| SwapError::Signing(e.to_string()))
    }
}

// =============================================================================
// JSON-RPC CLIENT
// =============================================================================

/// Solana JSON-RPC client over reqwest
pub struct RpcClient {
    url: String,
    commitment: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: &str, timeout_secs: u64, commitment: &str) -> Result<Self, SwapError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            url: url.to_string(),
            commitment: commitment.to_string(),
            http,
        })
    }

    /// Build from the `[rpc]` config section
    pub fn from_config() -> Result<Self, SwapError> {
        let (url, timeout, commitment) = with_config(|cfg| {
            (
                cfg.rpc.url.clone(),
                cfg.rpc.timeout_secs,
                cfg.rpc.commitment.clone(),
            )
        });
        Self::new(&url, timeout, &commitment)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and return its `result` field
    async fn call(&self, method: &str, params: Value) -> Result<Value, SwapError> {
        let rpc_payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        logger::debug(LogTag::Rpc, &format!("→ {} {}", method, self.url));

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&rpc_payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            logger::warning(LogTag::Rpc, &format!("{} rate limited by RPC", method));
            return Err(SwapError::Network(format!("{} rate limited (429)", method)));
        }
        if !status.is_success() {
            return Err(SwapError::Network(format!("{} returned HTTP {}", method, status)));
        }

        let mut body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let err = rpc_error(method, error);
            logger::debug(LogTag::Rpc, &format!("✗ {} error: {}", method, err));
            return Err(err);
        }

        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountInfo>, SwapError> {
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "mint": mint.to_string() },
                    { "encoding": "jsonParsed", "commitment": self.commitment }
                ]),
            )
            .await?;

        parse_token_accounts(&result)
    }

    async fn get_open_orders_accounts(
        &self,
        program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, SwapError> {
        use crate::constants::{OPEN_ORDERS_MARKET_OFFSET, OPEN_ORDERS_OWNER_OFFSET, OPEN_ORDERS_SPACE};

        let result = self
            .call(
                "getProgramAccounts",
                json!([
                    program_id.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": self.commitment,
                        "dataSlice": { "offset": 0, "length": 0 },
                        "filters": [
                            { "memcmp": { "offset": OPEN_ORDERS_MARKET_OFFSET, "bytes": market.to_string() } },
                            { "memcmp": { "offset": OPEN_ORDERS_OWNER_OFFSET, "bytes": owner.to_string() } },
                            { "dataSize": OPEN_ORDERS_SPACE }
                        ]
                    }
                ]),
            )
            .await?;

        let entries = result
            .as_array()
            .ok_or_else(|| SwapError::Encoding("getProgramAccounts: expected array".into()))?;

        entries
            .iter()
            .map(|entry| {
                entry
                    .get("pubkey")
                    .and_then(|p| p.as_str())
                    .and_then(|p| Pubkey::from_str(p).ok())
                    .ok_or_else(|| SwapError::Encoding("getProgramAccounts: bad pubkey".into()))
            })
            .collect()
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, SwapError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;

        let value = match result.get("value") {
            Some(Value::Null) | None => return Ok(None),
            Some(v) => v,
        };

        let encoded = value
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.as_str())
            .ok_or_else(|| SwapError::Encoding(format!("getAccountInfo {}: no data", address)))?;

        general_purpose::STANDARD
            .decode(encoded)
            .map(Some)
            .map_err(|e| SwapError::Encoding(format!("base64: {}", e)))
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, SwapError> {
        let result = self
            .call(
                "getBalance",
                json!([owner.to_string(), { "commitment": self.commitment }]),
            )
            .await?;

        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SwapError::Encoding("getBalance: missing value".into()))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, SwapError> {
        let result = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": "finalized" }]),
            )
            .await?;

        let blockhash = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|b| b.as_str())
            .ok_or_else(|| SwapError::Encoding("getLatestBlockhash: missing blockhash".into()))?;

        Hash::from_str(blockhash).map_err(|e| SwapError::Encoding(format!("blockhash: {}", e)))
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionDetails>, SwapError> {
        let result = self
            .call(
                "getTransaction",
                json!([
                    signature,
                    {
                        "encoding": "json",
                        "commitment": self.commitment,
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String, SwapError> {
        let serialized = bincode::serialize(transaction)?;
        let encoded = general_purpose::STANDARD.encode(serialized);
        let signature = transaction
            .signatures
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default();

        let result = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    { "encoding": "base64", "preflightCommitment": self.commitment }
                ]),
            )
            .await
            .map_err(|e| match e {
                SwapError::Execution { reason, .. } => SwapError::Execution {
                    signature: signature.clone(),
                    reason,
                },
                other => other,
            })?;

        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SwapError::Encoding("sendTransaction: missing signature".into()))
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, SwapError> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;

        match result.get("value").and_then(|v| v.get(0)) {
            Some(Value::Null) | None => Ok(None),
            Some(status) => Ok(Some(serde_json::from_value(status.clone())?)),
        }
    }
}

/// Node-side JSON-RPC codes that clear up on retry: block not available,
/// node behind, slot skipped, block status not yet available, rate limited
pub const TRANSIENT_RPC_CODES: &[i64] = &[-32004, -32005, -32007, -32014, -32429];

/// Map a JSON-RPC `error` object to a SwapError
///
/// A preflight rejection carries the simulated transaction error under
/// `data.err` and is classified like a landed failure. Other submit
/// rejections are execution failures; read errors are unavailable data
/// unless the node reports a transient condition.
pub fn rpc_error(method: &str, error: &Value) -> SwapError {
    let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown RPC error");

    if let Some(err) = error.pointer("/data/err").filter(|e| !e.is_null()) {
        let parsed = parse_transaction_error(err);
        return SwapError::Execution {
            signature: String::new(),
            reason: parsed.user_message(),
        };
    }
    if TRANSIENT_RPC_CODES.contains(&code) {
        return SwapError::Network(format!("{}: {} ({})", method, message, code));
    }
    if method == "sendTransaction" {
        return SwapError::Execution {
            signature: String::new(),
            reason: format!("{} ({})", message, code),
        };
    }
    SwapError::unavailable(method, format!("{} ({})", message, code))
}

/// Parse a jsonParsed getTokenAccountsByOwner result
pub fn parse_token_accounts(result: &Value) -> Result<Vec<TokenAccountInfo>, SwapError> {
    let entries = result
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SwapError::Encoding("getTokenAccountsByOwner: expected value array".into()))?;

    let mut accounts = Vec::with_capacity(entries.len());
    for entry in entries {
        let address = entry
            .get("pubkey")
            .and_then(|p| p.as_str())
            .and_then(|p| Pubkey::from_str(p).ok());
        let info = entry.pointer("/account/data/parsed/info");
        let mint = info
            .and_then(|i| i.get("mint"))
            .and_then(|m| m.as_str())
            .and_then(|m| Pubkey::from_str(m).ok());
        let token_amount = info.and_then(|i| i.get("tokenAmount"));

        let (Some(address), Some(mint), Some(token_amount)) = (address, mint, token_amount) else {
            return Err(SwapError::Encoding(
                "getTokenAccountsByOwner: malformed account entry".into(),
            ));
        };

        let amount = token_amount
            .get("amount")
            .and_then(|a| a.as_str())
            .and_then(|a| a.parse::<u64>().ok())
            .unwrap_or(0);
        let ui_amount = token_amount
            .get("uiAmount")
            .and_then(|a| a.as_f64())
            .unwrap_or(0.0);

        accounts.push(TokenAccountInfo {
            address,
            mint,
            amount,
            ui_amount,
        });
    }

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_accounts() {
        let owner_account = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let result = json!({
            "context": {"slot": 1},
            "value": [{
                "pubkey": owner_account.to_string(),
                "account": {
                    "data": {
                        "parsed": {
                            "info": {
                                "mint": mint.to_string(),
                                "owner": Pubkey::new_unique().to_string(),
                                "tokenAmount": {"amount": "1250000", "decimals": 6, "uiAmount": 1.25}
                            },
                            "type": "account"
                        },
                        "program": "spl-token"
                    }
                }
            }]
        });

        let accounts = parse_token_accounts(&result).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, owner_account);
        assert_eq!(accounts[0].mint, mint);
        assert_eq!(accounts[0].amount, 1_250_000);
        assert_eq!(accounts[0].ui_amount, 1.25);
    }

    #[test]
    fn test_parse_token_accounts_rejects_malformed() {
        let result = json!({"value": [{"pubkey": "not-a-key"}]});
        assert!(parse_token_accounts(&result).is_err());
    }

    #[test]
    fn test_simulation_failure_is_execution() {
        let error = json!({
            "code": -32002,
            "message": "Transaction simulation failed: Error processing Instruction 2: custom program error: 0x1",
            "data": {"err": {"InstructionError": [2, {"Custom": 1}]}, "logs": []}
        });

        assert_eq!(
            rpc_error("sendTransaction", &error),
            SwapError::Execution {
                signature: String::new(),
                reason: "Insufficient funds.".into()
            }
        );
    }

    #[test]
    fn test_rpc_error_classification() {
        let behind = rpc_error(
            "getTransaction",
            &json!({"code": -32005, "message": "Node is behind by 42 slots"}),
        );
        assert!(behind.is_transient());

        let missing = rpc_error(
            "getTransaction",
            &json!({"code": -32004, "message": "Block not available for slot 1"}),
        );
        assert!(missing.is_transient());

        let invalid = rpc_error("getAccountInfo", &json!({"code": -32602, "message": "Invalid param"}));
        assert_eq!(invalid.kind(), "data-unavailable");
        assert!(!invalid.is_transient());

        let rejected = rpc_error(
            "sendTransaction",
            &json!({"code": -32003, "message": "Transaction signature verification failure"}),
        );
        assert_eq!(rejected.kind(), "execution");
    }

    /// One-shot HTTP server answering the first request with `body`
    fn serve_once(body: &'static str) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        url
    }

    fn signed_transfer() -> Transaction {
        use solana_sdk::system_instruction;

        let wallet = Keypair::new();
        let ix = system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 1);
        Transaction::new_signed_with_payer(&[ix], Some(&wallet.pubkey()), &[&wallet], Hash::new_unique())
    }

    #[tokio::test]
    async fn test_send_transaction_translates_preflight_failure() {
        let url = serve_once(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Transaction simulation failed: Error processing Instruction 2: custom program error: 0x1","data":{"err":{"InstructionError":[2,{"Custom":1}]},"logs":[]}}}"#,
        );
        let client = RpcClient::new(&url, 5, "confirmed").unwrap();
        let transaction = signed_transfer();

        let err = client.send_transaction(&transaction).await.unwrap_err();
        assert_eq!(
            err,
            SwapError::Execution {
                signature: transaction.signatures[0].to_string(),
                reason: "Insufficient funds.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_node_behind_is_transient() {
        let url = serve_once(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"Node is behind by 42 slots"}}"#,
        );
        let client = RpcClient::new(&url, 5, "confirmed").unwrap();

        let err = client.get_transaction("sig").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_keypair_signer_adds_owner_signature() {
        use solana_sdk::system_instruction;

        let wallet = Keypair::new();
        let signer = KeypairSigner::new(wallet.insecure_clone());
        let ix = system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 1);
        let mut tx = Transaction::new_with_payer(&[ix], Some(&wallet.pubkey()));
        tx.message.recent_blockhash = Hash::new_unique();

        signer.sign_transaction(&mut tx).await.unwrap();
        assert!(tx.is_signed());
    }
}
