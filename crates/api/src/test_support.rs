//! Router harness for route tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header::AUTHORIZATION},
};
use http_body_util::BodyExt;
use poolbank_core::ledger::{
    AccountNumberGenerator, Actor, AllocationRequest, LedgerStore, NewAccount, Provisioner,
};
use poolbank_db::MemoryLedgerStore;
use poolbank_shared::types::UserId;
use poolbank_shared::{JwtConfig, JwtService, Role};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use crate::{AppState, create_router};

pub const ALICE_NUMBER: &str = "7700000001";
pub const BOB_NUMBER: &str = "7700000002";

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryLedgerStore>,
    pub alice: UserId,
    pub bob: UserId,
    pub admin: UserId,
}

impl Harness {
    /// Pool of 1000, Alice funded with 300, Bob empty.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::with_pool(dec!(1000), Decimal::ZERO));
        let alice = UserId::new();
        let bob = UserId::new();

        for (id, number, name) in [(alice, ALICE_NUMBER, "Alice"), (bob, BOB_NUMBER, "Bob")] {
            store
                .insert_account(NewAccount {
                    id,
                    account_number: number.to_string(),
                    full_name: Some(name.to_string()),
                })
                .await
                .unwrap();
        }
        store
            .grant(AllocationRequest {
                account_number: ALICE_NUMBER.to_string(),
                amount: dec!(300),
                reason: None,
                actor: Actor::system(),
            })
            .await
            .unwrap();

        let state = AppState {
            store: store.clone(),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
            provisioner: Arc::new(Provisioner::new(AccountNumberGenerator::new("77"), 3)),
            recent_limit: 30,
        };

        Self {
            state,
            store,
            alice,
            bob,
            admin: UserId::new(),
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn token(&self, user: UserId, role: Role) -> String {
        self.state
            .jwt_service
            .generate_access_token(user.into_inner(), role)
            .unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token(self.admin, Role::Admin)
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn post(&self, uri: &str, token: &str, body: &JsonValue) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Asserts the status and returns the decoded JSON body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> JsonValue {
    assert_eq!(response.status(), status);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
