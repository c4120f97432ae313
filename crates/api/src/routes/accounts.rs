//! Account holder routes: lookup, profile provisioning and the dashboard.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::Response,
    routing::{get, post},
};
use poolbank_core::ledger::LedgerError;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::response::{ledger_error_response, ok, validation_error};
use crate::{AppState, middleware::AuthUser};

/// Number of transactions shown on the dashboard.
const DASHBOARD_TRANSACTIONS: u64 = 50;

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lookup-account", get(lookup_account))
        .route("/profile", post(provision_profile))
        .route("/me", get(dashboard))
}

/// Query parameters for resolving an account number.
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    /// Account number to resolve.
    pub account: Option<String>,
}

/// Request body for provisioning the caller's account.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    /// Holder's display name.
    pub full_name: Option<String>,
    /// Preferred account number, tried before random ones.
    pub account_number: Option<String>,
}

/// GET `/lookup-account?account=` - Resolve an account number to its holder.
async fn lookup_account(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<LookupQuery>,
) -> Response {
    let Some(account) = query.account.as_deref().map(str::trim).filter(|a| !a.is_empty()) else {
        return validation_error("Account number is required");
    };

    match state.store.lookup_account(account).await {
        Ok(Some(summary)) => ok(json!({
            "full_name": summary.full_name,
            "account_number": summary.account_number,
        })),
        Ok(None) => ledger_error_response(&LedgerError::AccountNotFound(account.to_string())),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/profile` - Ensure the caller has an account.
async fn provision_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Response {
    let result = state
        .provisioner
        .provision(
            state.store.as_ref(),
            auth.user_id(),
            payload.full_name.as_deref(),
            payload.account_number.as_deref(),
        )
        .await;

    match result {
        Ok(account) => {
            info!(user_id = %auth.user_id(), account = %account.account_number, "Profile ready");
            ok(json!({ "account_number": account.account_number }))
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/me` - The caller's account, recent transactions and notifications.
async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Response {
    let user = auth.user_id();

    let account = match state.store.account_by_id(user).await {
        Ok(Some(account)) => account,
        Ok(None) => return ledger_error_response(&LedgerError::AccountNotFound(user.to_string())),
        Err(e) => return ledger_error_response(&e),
    };

    let transactions = match state
        .store
        .transactions_for_user(user, DASHBOARD_TRANSACTIONS)
        .await
    {
        Ok(transactions) => transactions,
        Err(e) => return ledger_error_response(&e),
    };

    let notifications = match state
        .store
        .notifications_for_user(user, state.recent_limit)
        .await
    {
        Ok(notifications) => notifications,
        Err(e) => return ledger_error_response(&e),
    };

    ok(json!({
        "account": account,
        "transactions": transactions,
        "notifications": notifications,
    }))
}
