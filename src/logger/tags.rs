/// Log tags, one per engine module

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    Swap,
    Quote,
    Market,
    Accounts,
    Transaction,
    Confirm,
    Rpc,
    Api,
    Wallet,
    System,
    Other(String),
}

impl LogTag {
    /// Key used by --debug-<key> flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Swap => "swap".to_string(),
            LogTag::Quote => "quote".to_string(),
            LogTag::Market => "market".to_string(),
            LogTag::Accounts => "accounts".to_string(),
            LogTag::Transaction => "transaction".to_string(),
            LogTag::Confirm => "confirm".to_string(),
            LogTag::Rpc => "rpc".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Wallet => "wallet".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Transaction => "TX".to_string(),
            LogTag::Accounts => "ACCOUNTS".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }
}
