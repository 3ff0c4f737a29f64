/// Classification of on-chain transaction errors
///
/// Parses the `meta.err` JSON of a landed transaction into a structured
/// error with instruction index, custom code and a user-facing message.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of blockchain error handling strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    /// Permanent failures (insufficient funds, invalid accounts)
    Permanent,
    /// Temporary failures (blockhash expired, account in use)
    Temporary,
    /// Anything we do not recognise
    Uncertain,
}

/// Structured transaction error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransactionError {
    pub error_type: FailureType,
    pub instruction_index: Option<u8>,
    pub error_code: Option<u32>,
    pub error_name: String,
    pub description: String,
    pub raw_error: Value,
}

impl ChainTransactionError {
    pub fn error_type_name(&self) -> &'static str {
        match self.error_type {
            FailureType::Permanent => "PERMANENT",
            FailureType::Temporary => "TEMPORARY",
            FailureType::Uncertain => "UNCERTAIN",
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> String {
        match self.error_code {
            Some(code) if is_insufficient_funds_code(code) => "Insufficient funds.".to_string(),
            _ => match self.instruction_index {
                Some(index) => format!("{} (instruction {})", self.description, index),
                None => self.description.clone(),
            },
        }
    }
}

/// Custom codes reported by the token program and the exchange when the
/// payer cannot cover the order
pub fn is_insufficient_funds_code(code: u32) -> bool {
    code == 0x1 || code == 0x22
}

/// Parse structured transaction error from meta.err JSON
pub fn parse_transaction_error(error_value: &Value) -> ChainTransactionError {
    match error_value {
        // {"InstructionError": [index, detail]}
        Value::Object(obj) if obj.contains_key("InstructionError") => {
            if let Some(array) = obj["InstructionError"].as_array() {
                if array.len() >= 2 {
                    let index = array[0].as_u64().unwrap_or(0) as u8;
                    return parse_instruction_error(index, &array[1], error_value);
                }
            }
        }
        Value::String(s) => return parse_transaction_level_error(s, error_value),
        _ => {}
    }

    ChainTransactionError {
        error_type: FailureType::Uncertain,
        instruction_index: None,
        error_code: None,
        error_name: "UnknownError".to_string(),
        description: format!("Unknown error structure: {}", error_value),
        raw_error: error_value.clone(),
    }
}

fn parse_instruction_error(index: u8, detail: &Value, raw_error: &Value) -> ChainTransactionError {
    match detail {
        // {"Custom": 34}
        Value::Object(obj) if obj.contains_key("Custom") => {
            let code = obj.get("Custom").and_then(|v| v.as_u64()).map(|c| c as u32);
            let (error_type, error_name, description) = match code {
                Some(code) if is_insufficient_funds_code(code) => (
                    FailureType::Permanent,
                    "InsufficientFunds".to_string(),
                    "Insufficient funds".to_string(),
                ),
                Some(code) => (
                    FailureType::Permanent,
                    format!("CustomError{}", code),
                    format!("Custom program error: 0x{:x}", code),
                ),
                None => (
                    FailureType::Uncertain,
                    "UnknownInstructionError".to_string(),
                    format!("Unknown instruction error at index {}", index),
                ),
            };

            ChainTransactionError {
                error_type,
                instruction_index: Some(index),
                error_code: code,
                error_name,
                description,
                raw_error: raw_error.clone(),
            }
        }
        // "InsufficientFunds", "InvalidAccountData", ...
        Value::String(s) => {
            let error_type = match s.as_str() {
                "AccountBorrowFailed" | "AccountBorrowOutstanding" => FailureType::Temporary,
                "InsufficientFunds" | "InvalidAccountData" | "InvalidArgument"
                | "MissingRequiredSignature" | "AccountAlreadyInitialized"
                | "UninitializedAccount" | "IncorrectProgramId" => FailureType::Permanent,
                _ => FailureType::Uncertain,
            };

            ChainTransactionError {
                error_type,
                instruction_index: Some(index),
                error_code: None,
                error_name: s.clone(),
                description: s.clone(),
                raw_error: raw_error.clone(),
            }
        }
        _ => ChainTransactionError {
            error_type: FailureType::Uncertain,
            instruction_index: Some(index),
            error_code: None,
            error_name: "UnknownInstructionError".to_string(),
            description: format!("Unknown instruction error at index {}", index),
            raw_error: raw_error.clone(),
        },
    }
}

fn parse_transaction_level_error(error_string: &str, raw_error: &Value) -> ChainTransactionError {
    let (error_type, description) = match error_string {
        "BlockhashNotFound" => (
            FailureType::Temporary,
            "Transaction blockhash has expired".to_string(),
        ),
        "AccountInUse" => (
            FailureType::Temporary,
            "Account is being used by another transaction".to_string(),
        ),
        "AlreadyProcessed" => (
            FailureType::Permanent,
            "Transaction has already been processed".to_string(),
        ),
        "InsufficientFundsForFee" => (
            FailureType::Permanent,
            "Insufficient SOL to pay transaction fee".to_string(),
        ),
        "SignatureFailure" => (
            FailureType::Permanent,
            "Transaction signature verification failed".to_string(),
        ),
        _ => (
            FailureType::Uncertain,
            format!("Unknown transaction error: {}", error_string),
        ),
    };

    ChainTransactionError {
        error_type,
        instruction_index: None,
        error_code: None,
        error_name: error_string.to_string(),
        description,
        raw_error: raw_error.clone(),
    }
}

pub fn is_permanent_failure(error: &ChainTransactionError) -> bool {
    error.error_type == FailureType::Permanent
}

pub fn is_temporary_failure(error: &ChainTransactionError) -> bool {
    error.error_type == FailureType::Temporary
}
