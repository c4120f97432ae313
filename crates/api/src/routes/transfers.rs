//! Peer-to-peer transfer route.

use axum::{Json, Router, extract::State, response::Response, routing::post};
use poolbank_core::ledger::TransferRequest;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::response::{ledger_error_response, ok};
use crate::{AppState, middleware::AuthUser};

/// Creates the transfer routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfers", post(create_transfer))
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Receiving account number.
    pub to_account: String,
    /// Amount to send.
    pub amount: Decimal,
    /// Free-text reference shown to both parties.
    pub reference: Option<String>,
}

/// POST `/transfers` - Send money from the caller's account.
///
/// Serialization conflicts come back as `409 CONCURRENCY_CONFLICT`; the
/// client decides whether to resubmit.
async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateTransferRequest>,
) -> Response {
    let request = TransferRequest {
        from: auth.user_id(),
        to_account_number: payload.to_account.trim().to_string(),
        amount: payload.amount,
        reference: payload.reference,
    };

    match state.store.transfer(request).await {
        Ok(transaction) => ok(json!({ "transaction": transaction })),
        Err(e) => ledger_error_response(&e),
    }
}
