/// Horizon API response types
///
/// These types match the Horizon JSON format so clients can consume them transparently.

use serde::{Deserialize, Serialize};

/// Account response from /accounts/{account_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub account_id: String,
    /// Horizon encodes 64-bit integers as strings
    pub sequence: String,
    pub subentry_count: u32,
    pub num_sponsoring: u32,
    pub num_sponsored: u32,
    pub balances: Vec<BalanceResponse>,
    pub signers: Vec<SignerResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: String,
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerResponse {
    pub key: String,
    pub weight: u32,
    #[serde(rename = "type")]
    pub signer_type: String,
}

/// Form body of POST /transactions
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitForm {
    pub tx: String,
}

/// Successful submission response from POST /transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    pub ledger: u32,
    pub successful: bool,
    pub envelope_xdr: String,
}

/// Horizon problem document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<ProblemExtras>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemExtras {
    pub envelope_xdr: String,
    pub result_codes: ResultCodes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCodes {
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
}

/// Render stroops the way Horizon does: always seven decimals
pub fn format_stroops(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let magnitude = stroops.unsigned_abs();
    format!("{}{}.{:07}", sign, magnitude / 10_000_000, magnitude % 10_000_000)
}
