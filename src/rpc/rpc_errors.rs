use solana_client::client_error::ClientError;
use thiserror::Error;

/// Errors raised while talking to the cluster
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Timeout errors
    #[error("Timeout (endpoint: {endpoint})")]
    Timeout { endpoint: String },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Rate limit exceeded, typically the faucet refusing airdrops
    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Account not found: {account} (endpoint: {endpoint})")]
    AccountNotFound { account: String, endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    /// The cluster returned something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            LedgerError::Transport { endpoint, .. } => Some(endpoint),
            LedgerError::Timeout { endpoint } => Some(endpoint),
            LedgerError::RpcResponse { endpoint, .. } => Some(endpoint),
            LedgerError::RateLimitExceeded { endpoint } => Some(endpoint),
            LedgerError::BlockhashNotFound { endpoint } => Some(endpoint),
            LedgerError::TransactionExpired { endpoint } => Some(endpoint),
            LedgerError::AccountNotFound { endpoint, .. } => Some(endpoint),
            LedgerError::InsufficientFunds { endpoint } => Some(endpoint),
            LedgerError::Malformed(_) => None,
        }
    }

    /// Short label used in structured log fields
    pub fn category(&self) -> &'static str {
        match self {
            LedgerError::Transport { .. } => "transport",
            LedgerError::Timeout { .. } => "timeout",
            LedgerError::RpcResponse { .. } => "rpc",
            LedgerError::RateLimitExceeded { .. } => "rate_limit",
            LedgerError::BlockhashNotFound { .. } => "blockhash",
            LedgerError::TransactionExpired { .. } => "expired",
            LedgerError::AccountNotFound { .. } => "account",
            LedgerError::InsufficientFunds { .. } => "funds",
            LedgerError::Malformed(_) => "malformed",
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        Self::classify(&err.to_string(), endpoint)
    }

    /// Classify an error message returned by the RPC client
    pub fn classify(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if err_str.contains("blockhash not found") {
            LedgerError::BlockhashNotFound { endpoint }
        } else if err_str.contains("transaction expired")
            || err_str.contains("block height exceeded")
        {
            LedgerError::TransactionExpired { endpoint }
        } else if err_str.contains("accountnotfound") || err_str.contains("account not found") {
            LedgerError::AccountNotFound {
                account: "unknown".to_string(),
                endpoint,
            }
        } else if err_str.contains("insufficient funds")
            || err_str.contains("insufficient lamports")
        {
            LedgerError::InsufficientFunds { endpoint }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            LedgerError::RateLimitExceeded { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            LedgerError::Timeout { endpoint }
        } else if err_str.contains("connection refused")
            || err_str.contains("error sending request")
            || err_str.contains("connection reset")
        {
            LedgerError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(',').parse::<i64>().ok());

            LedgerError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    const EP: &str = "http://127.0.0.1:8899";

    #[test]
    fn test_classify_known_messages() {
        assert!(matches!(
            LedgerError::classify("Blockhash not found", EP),
            LedgerError::BlockhashNotFound { .. }
        ));
        assert!(matches!(
            LedgerError::classify("block height exceeded", EP),
            LedgerError::TransactionExpired { .. }
        ));
        assert!(matches!(
            LedgerError::classify("429 Too Many Requests", EP),
            LedgerError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            LedgerError::classify("error sending request for url", EP),
            LedgerError::Transport { .. }
        ));
        assert!(matches!(
            LedgerError::classify("Attempt to debit an account but found no record of a prior credit: AccountNotFound", EP),
            LedgerError::AccountNotFound { .. }
        ));
    }

    #[test]
    fn test_classify_extracts_code() {
        let err = LedgerError::classify("RPC response error code: -32002 preflight failed", EP);
        match err {
            LedgerError::RpcResponse { code, .. } => assert_eq!(code, Some(-32002)),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_error_endpoint() {
        let err = LedgerError::Timeout {
            endpoint: EP.to_string(),
        };
        assert_eq!(err.endpoint(), Some(EP));
        assert_eq!(err.category(), "timeout");
        assert_eq!(LedgerError::Malformed("x".into()).endpoint(), None);
    }
}
