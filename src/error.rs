//! Error types for wallet operations
//!
//! Splits failures into the three places they can happen: local validation
//! before any network call, transaction assembly against the ledger, and
//! submission to the network.

use thiserror::Error;

/// Core error type for wallet operations
#[derive(Error, Debug)]
pub enum WalletError {
    /// Malformed or sub-minimum balance / limit input
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Address that does not decode as an ed25519 account id
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Asset code or issuer that cannot be encoded
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Transaction that cannot be assembled (empty, too many operations)
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Source account absent from the ledger
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Network rejected the transaction
    #[error("Transaction failed: {result_code}{}", format_operation_codes(.operation_codes))]
    SubmissionRejected {
        result_code: String,
        operation_codes: Vec<String>,
    },

    /// Horizon answered with an unexpected error status
    #[error("Horizon error (status {status}): {detail}")]
    Horizon { status: u16, detail: String },

    /// Transport failure talking to Horizon
    #[error("Network error: {0}")]
    Network(String),

    /// Horizon payload could not be decoded
    #[error("Invalid response from Horizon: {0}")]
    InvalidResponse(String),

    /// XDR encoding or decoding failure
    #[error("XDR error: {0}")]
    Xdr(String),
}

fn format_operation_codes(codes: &[String]) -> String {
    if codes.is_empty() {
        String::new()
    } else {
        format!(" [{}]", codes.join(", "))
    }
}

impl WalletError {
    /// Create a submission rejected error
    pub fn rejected(result_code: impl Into<String>, operation_codes: Vec<String>) -> Self {
        Self::SubmissionRejected {
            result_code: result_code.into(),
            operation_codes,
        }
    }

    /// True for errors detected locally, before any network round-trip
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidAddress(_)
                | Self::InvalidAsset(_)
                | Self::InvalidTransaction(_)
                | Self::Xdr(_)
        )
    }

    /// True for errors reported by the ledger or its endpoint
    pub fn is_network_side(&self) -> bool {
        !self.is_preflight()
    }

    /// Transaction-level result code of a rejected submission
    pub fn result_code(&self) -> Option<&str> {
        match self {
            Self::SubmissionRejected { result_code, .. } => Some(result_code),
            _ => None,
        }
    }
}

impl From<stellar_xdr::curr::Error> for WalletError {
    fn from(err: stellar_xdr::curr::Error) -> Self {
        Self::Xdr(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_includes_codes() {
        let err = WalletError::rejected("tx_failed", vec!["op_low_reserve".to_string()]);
        assert_eq!(err.to_string(), "Transaction failed: tx_failed [op_low_reserve]");
        assert_eq!(err.result_code(), Some("tx_failed"));

        let err = WalletError::rejected("tx_bad_seq", vec![]);
        assert_eq!(err.to_string(), "Transaction failed: tx_bad_seq");
    }

    #[test]
    fn test_preflight_classification() {
        assert!(WalletError::InvalidAmount("x".into()).is_preflight());
        assert!(WalletError::InvalidAddress("x".into()).is_preflight());
        assert!(WalletError::AccountNotFound("G".into()).is_network_side());
        assert!(WalletError::rejected("tx_bad_auth", vec![]).is_network_side());
    }
}
