//! Administrator routes: overview, grants, adjustments and account controls.

use axum::{
    Json, Router,
    extract::State,
    response::Response,
    routing::{get, post},
};
use poolbank_core::ledger::{AllocationRequest, KycStatus, PoolUpdate};
use poolbank_shared::types::TransactionId;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::response::{ledger_error_response, ok, validation_error};
use crate::{AppState, middleware::AdminUser};

/// Creates the admin routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/overview", get(overview))
        .route("/admin/grant", post(grant))
        .route("/admin/adjust", post(adjust))
        .route("/admin/account", post(account_action))
        .route("/admin/kyc", post(set_kyc))
        .route("/admin/flag", post(flag_transaction))
        .route("/admin/pool", post(update_pool))
}

/// Request body for grants and adjustments.
#[derive(Debug, Deserialize)]
pub struct AllocationBody {
    /// Target account number.
    pub account: String,
    /// Positive for grants; signed for adjustments.
    pub amount: Decimal,
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Account control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountAction {
    /// Block outbound transfers.
    Freeze,
    /// Lift a freeze.
    Unfreeze,
    /// Set the per-transaction transfer limit.
    Limit,
}

/// Request body for `/admin/account`.
#[derive(Debug, Deserialize)]
pub struct AccountActionBody {
    /// Target account number.
    pub account: String,
    /// What to do.
    pub action: AccountAction,
    /// New limit, required for `limit`.
    pub limit: Option<Decimal>,
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Request body for `/admin/kyc`.
#[derive(Debug, Deserialize)]
pub struct KycBody {
    /// Target account number.
    pub account: String,
    /// New status.
    pub status: KycStatus,
}

/// Request body for `/admin/flag`.
#[derive(Debug, Deserialize)]
pub struct FlagBody {
    /// Transaction to flag.
    pub transaction_id: TransactionId,
    /// Why it looks suspicious.
    pub reason: Option<String>,
}

/// Request body for `/admin/pool`.
#[derive(Debug, Deserialize)]
pub struct PoolBody {
    /// New allocatable total.
    pub total: Option<Decimal>,
    /// New reserve.
    pub reserve: Option<Decimal>,
}

/// GET `/admin/overview` - Pool, aggregates, accounts, recent audit and flags.
async fn overview(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match state.store.overview(state.recent_limit).await {
        Ok(overview) => ok(json!({ "overview": overview })),
        Err(e) => ledger_error_response(&e),
    }
}

fn allocation(admin: &AdminUser, body: AllocationBody) -> AllocationRequest {
    AllocationRequest {
        account_number: body.account.trim().to_string(),
        amount: body.amount,
        reason: body.reason,
        actor: admin.actor(),
    }
}

/// POST `/admin/grant` - Credit an account from the pool.
async fn grant(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<AllocationBody>,
) -> Response {
    match state.store.grant(allocation(&admin, body)).await {
        Ok(transaction) => ok(json!({ "transaction": transaction })),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/admin/adjust` - Signed correction between the pool and an account.
async fn adjust(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<AllocationBody>,
) -> Response {
    match state.store.adjust(allocation(&admin, body)).await {
        Ok(transaction) => ok(json!({ "transaction": transaction })),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/admin/account` - Freeze, unfreeze or limit an account.
async fn account_action(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<AccountActionBody>,
) -> Response {
    let account = body.account.trim();
    let actor = admin.actor();

    let result = match body.action {
        AccountAction::Freeze => state.store.freeze(account, body.reason, actor).await,
        AccountAction::Unfreeze => state.store.unfreeze(account, body.reason, actor).await,
        AccountAction::Limit => {
            let Some(limit) = body.limit else {
                return validation_error("A limit is required for the limit action");
            };
            state
                .store
                .set_limit(account, limit, body.reason, actor)
                .await
        }
    };

    match result {
        Ok(account) => ok(json!({ "account": account })),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/admin/kyc` - Record a KYC decision.
async fn set_kyc(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<KycBody>,
) -> Response {
    match state
        .store
        .set_kyc_status(body.account.trim(), body.status, admin.actor())
        .await
    {
        Ok(account) => ok(json!({ "account": account })),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/admin/flag` - Flag a transaction for review.
async fn flag_transaction(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<FlagBody>,
) -> Response {
    match state
        .store
        .flag_transaction(body.transaction_id, body.reason, admin.actor())
        .await
    {
        Ok(flag) => ok(json!({ "flag": flag })),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/admin/pool` - Overwrite the pool total, the reserve, or both.
///
/// Both values are validated before either is written.
async fn update_pool(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<PoolBody>,
) -> Response {
    let update = PoolUpdate {
        total: body.total,
        reserve: body.reserve,
    };

    match state.store.update_pool(update, admin.actor()).await {
        Ok(pool) => ok(json!({ "pool": pool })),
        Err(e) => ledger_error_response(&e),
    }
}
