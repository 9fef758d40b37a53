//! Horizon client
//!
//! The ledger is reached through two calls: read an account's sequence
//! number, and submit a signed envelope. [`LedgerClient`] is that seam;
//! [`HorizonClient`] implements it over blocking HTTP. There are no retries:
//! a rejected transaction is reported and the caller rebuilds it.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    Limits, OperationResult, OperationResultTr, ReadXdr, TransactionResult,
    TransactionResultResult,
};

use crate::address::Address;
use crate::error::WalletError;
use crate::transaction::SignedTransaction;
use crate::Result;

pub trait LedgerClient {
    /// Current sequence number of `address`, or `AccountNotFound`
    fn account_sequence(&self, address: &Address) -> Result<i64>;

    /// Submit a signed envelope; rejection surfaces as `SubmissionRejected`
    fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResponse>;
}

/// Accepted transaction as reported by Horizon
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    pub ledger: u32,
    #[serde(default = "default_successful")]
    pub successful: bool,
    #[serde(default)]
    pub envelope_xdr: Option<String>,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

fn default_successful() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence: String,
}

/// Horizon problem document (RFC 7807 style)
#[derive(Debug, Default, Deserialize)]
struct Problem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Default, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: String,
    #[serde(default)]
    operations: Vec<String>,
}

pub struct HorizonClient {
    client: Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("stellar-wallet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn problem_error(status: StatusCode, body: &str) -> WalletError {
        let problem: Problem = serde_json::from_str(body).unwrap_or_default();

        if let Some(codes) = problem.extras.and_then(|extras| extras.result_codes) {
            if !codes.transaction.is_empty() {
                log::warn!(
                    "Transaction rejected: {} {:?}",
                    codes.transaction,
                    codes.operations
                );
                return WalletError::rejected(codes.transaction, codes.operations);
            }
        }

        let detail = match (problem.title.is_empty(), problem.detail.is_empty()) {
            (true, true) => body.to_string(),
            (false, true) => problem.title,
            (true, false) => problem.detail,
            (false, false) => format!("{}: {}", problem.title, problem.detail),
        };
        WalletError::Horizon {
            status: status.as_u16(),
            detail,
        }
    }
}

impl LedgerClient for HorizonClient {
    fn account_sequence(&self, address: &Address) -> Result<i64> {
        // Only a decodable account id may become a path segment
        address.public_key_bytes()?;
        let url = format!("{}/accounts/{}", self.base_url, address.as_str().trim());
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WalletError::AccountNotFound(address.to_string()));
        }

        let body = response.text()?;
        if !status.is_success() {
            return Err(Self::problem_error(status, &body));
        }

        let account: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| WalletError::InvalidResponse(format!("account {}: {}", address, e)))?;
        let sequence = account.sequence.parse::<i64>().map_err(|_| {
            WalletError::InvalidResponse(format!("bad sequence number '{}'", account.sequence))
        })?;

        log::info!("Account {} is at sequence {}", address, sequence);
        Ok(sequence)
    }

    fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        let url = format!("{}/transactions", self.base_url);
        log::info!(
            "Submitting transaction with {} signature(s) to {}",
            tx.signature_count(),
            url
        );

        let response = self
            .client
            .post(&url)
            .form(&[("tx", tx.envelope_xdr())])
            .send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(Self::problem_error(status, &body));
        }

        let accepted: SubmitResponse = serde_json::from_str(&body)
            .map_err(|e| WalletError::InvalidResponse(format!("submission: {}", e)))?;
        if !accepted.successful {
            let (result_code, operation_codes) = accepted
                .result_xdr
                .as_deref()
                .and_then(decode_result_codes)
                .unwrap_or_else(|| ("tx_failed".to_string(), Vec::new()));
            log::warn!("Transaction not successful: {} {:?}", result_code, operation_codes);
            return Err(WalletError::rejected(result_code, operation_codes));
        }

        log::info!(
            "Transaction {} included in ledger {}",
            accepted.hash,
            accepted.ledger
        );
        Ok(accepted)
    }
}

/// Result codes from a base64 `TransactionResult`, named like Horizon's
/// (`tx_failed`, `op_underfunded`)
fn decode_result_codes(result_xdr: &str) -> Option<(String, Vec<String>)> {
    let result = TransactionResult::from_xdr_base64(result_xdr.trim(), Limits::none()).ok()?;
    let operations = match &result.result {
        TransactionResultResult::TxSuccess(ops) | TransactionResultResult::TxFailed(ops) => {
            ops.iter().map(operation_code).collect()
        }
        _ => Vec::new(),
    };
    Some((snake_case(result.result.name()), operations))
}

fn operation_code(result: &OperationResult) -> String {
    let inner = match result {
        OperationResult::OpInner(tr) => match tr {
            OperationResultTr::CreateAccount(r) => r.name(),
            OperationResultTr::ChangeTrust(r) => r.name(),
            OperationResultTr::SetOptions(r) => r.name(),
            OperationResultTr::BeginSponsoringFutureReserves(r) => r.name(),
            OperationResultTr::EndSponsoringFutureReserves(r) => r.name(),
            other => return format!("op_{}", snake_case(other.name())),
        },
        other => return snake_case(other.name()),
    };
    format!("op_{}", snake_case(inner))
}

/// `TxBadSeq` -> `tx_bad_seq`
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_with_result_codes_is_rejection() {
        let body = r#"{
            "type": "https://stellar.org/horizon-errors/transaction_failed",
            "title": "Transaction Failed",
            "status": 400,
            "extras": {
                "result_codes": {"transaction": "tx_failed", "operations": ["op_low_reserve"]}
            }
        }"#;
        let err = HorizonClient::problem_error(StatusCode::BAD_REQUEST, body);
        match err {
            WalletError::SubmissionRejected {
                result_code,
                operation_codes,
            } => {
                assert_eq!(result_code, "tx_failed");
                assert_eq!(operation_codes, vec!["op_low_reserve".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_problem_without_codes_is_horizon_error() {
        let body = r#"{"title": "Timeout", "status": 504, "detail": "try again"}"#;
        let err = HorizonClient::problem_error(StatusCode::GATEWAY_TIMEOUT, body);
        assert!(matches!(
            err,
            WalletError::Horizon { status: 504, ref detail } if detail == "Timeout: try again"
        ));

        let err = HorizonClient::problem_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(
            err,
            WalletError::Horizon { status: 502, ref detail } if detail == "upstream down"
        ));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = HorizonClient::new("https://horizon-testnet.stellar.org/").unwrap();
        assert_eq!(client.base_url(), "https://horizon-testnet.stellar.org");
    }

    #[test]
    fn test_result_xdr_codes() {
        use stellar_xdr::curr::{CreateAccountResult, TransactionResultExt, WriteXdr};

        let result = TransactionResult {
            fee_charged: 200,
            result: TransactionResultResult::TxFailed(
                vec![
                    OperationResult::OpInner(OperationResultTr::CreateAccount(
                        CreateAccountResult::Success,
                    )),
                    OperationResult::OpInner(OperationResultTr::CreateAccount(
                        CreateAccountResult::Underfunded,
                    )),
                    OperationResult::OpNoAccount,
                ]
                .try_into()
                .unwrap(),
            ),
            ext: TransactionResultExt::V0,
        };
        let xdr = result.to_xdr_base64(Limits::none()).unwrap();

        let (code, operations) = decode_result_codes(&xdr).unwrap();
        assert_eq!(code, "tx_failed");
        assert_eq!(operations, vec!["op_success", "op_underfunded", "op_no_account"]);

        assert!(decode_result_codes("not xdr").is_none());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("TxBadSeq"), "tx_bad_seq");
        assert_eq!(snake_case("LowReserve"), "low_reserve");
    }

    #[test]
    fn test_account_lookup_rejects_non_account_paths() {
        // Nothing listens here; an HTTP attempt would be a Network error
        let client = HorizonClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .account_sequence(&Address::new("x/../transactions"))
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
    }
}
