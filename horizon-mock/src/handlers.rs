/// Axum HTTP handlers for Horizon API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use std::sync::Arc;

use crate::ledger::{MockLedger, SubmitError};
use crate::types::*;

/// Shared application state
pub type AppState = Arc<MockLedger>;

const PROBLEM_BASE: &str = "https://stellar.org/horizon-errors";

/// Custom error type for handlers, rendered as a Horizon problem document
pub enum ApiError {
    NotFound(String),
    Malformed(String),
    TransactionFailed {
        envelope_xdr: String,
        result_codes: ResultCodes,
    },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = match self {
            ApiError::NotFound(detail) => Problem {
                problem_type: format!("{}/not_found", PROBLEM_BASE),
                title: "Resource Missing".to_string(),
                status: 404,
                detail,
                extras: None,
            },
            ApiError::Malformed(detail) => Problem {
                problem_type: format!("{}/transaction_malformed", PROBLEM_BASE),
                title: "Transaction Malformed".to_string(),
                status: 400,
                detail,
                extras: None,
            },
            ApiError::TransactionFailed {
                envelope_xdr,
                result_codes,
            } => Problem {
                problem_type: format!("{}/transaction_failed", PROBLEM_BASE),
                title: "Transaction Failed".to_string(),
                status: 400,
                detail: "The transaction failed when submitted to the stellar network.".to_string(),
                extras: Some(ProblemExtras {
                    envelope_xdr,
                    result_codes,
                }),
            },
            ApiError::Internal(detail) => Problem {
                problem_type: format!("{}/server_error", PROBLEM_BASE),
                title: "Internal Server Error".to_string(),
                status: 500,
                detail,
                extras: None,
            },
        };

        let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

/// GET /accounts/{account_id}
/// Returns the account with its sequence number, balances and signers
pub async fn get_account(
    State(ledger): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    ledger
        .account_response(&account_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Account not found: {}", account_id)))
}

/// POST /transactions
/// Submits a base64 transaction envelope (form field `tx`)
pub async fn submit_transaction(
    State(ledger): State<AppState>,
    Form(form): Form<SubmitForm>,
) -> Result<Json<SubmitResponse>, ApiError> {
    match ledger.submit(&form.tx) {
        Ok(accepted) => Ok(Json(SubmitResponse {
            hash: accepted.hash,
            ledger: accepted.ledger,
            successful: true,
            envelope_xdr: form.tx,
        })),
        Err(SubmitError::Malformed(detail)) => Err(ApiError::Malformed(detail)),
        Err(SubmitError::Rejected { code, operations }) => {
            log::info!("Rejected transaction: {} {:?}", code, operations);
            Err(ApiError::TransactionFailed {
                envelope_xdr: form.tx,
                result_codes: ResultCodes {
                    transaction: code,
                    operations,
                },
            })
        }
        Err(err @ SubmitError::Poisoned) => Err(ApiError::Internal(err.to_string())),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
