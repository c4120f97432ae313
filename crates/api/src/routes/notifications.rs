//! Notification routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::post,
};
use poolbank_shared::types::NotificationId;
use serde_json::json;

use super::response::{ledger_error_response, ok};
use crate::{AppState, middleware::AuthUser};

/// Creates the notification routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications/{id}/read", post(mark_read))
}

/// POST `/notifications/{id}/read` - Mark one of the caller's notifications as read.
async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> Response {
    match state.store.mark_notification_read(auth.user_id(), id).await {
        Ok(notification) => ok(json!({ "notification": notification })),
        Err(e) => ledger_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use poolbank_core::ledger::LedgerStore;
    use poolbank_shared::Role;

    use super::*;
    use crate::test_support::{Harness, expect_json};

    #[tokio::test]
    async fn test_mark_read_own_notification() {
        let harness = Harness::new().await;
        let inbox = harness
            .store
            .notifications_for_user(harness.alice, 10)
            .await
            .unwrap();
        let token = harness.token(harness.alice, Role::User);

        let response = harness
            .post(
                &format!("/api/v1/notifications/{}/read", inbox[0].id),
                &token,
                &json!({}),
            )
            .await;

        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["notification"]["is_read"], true);
    }

    #[tokio::test]
    async fn test_cannot_mark_someone_elses_notification() {
        let harness = Harness::new().await;
        let inbox = harness
            .store
            .notifications_for_user(harness.alice, 10)
            .await
            .unwrap();
        let token = harness.token(harness.bob, Role::User);

        let response = harness
            .post(
                &format!("/api/v1/notifications/{}/read", inbox[0].id),
                &token,
                &json!({}),
            )
            .await;

        let body = expect_json(response, StatusCode::NOT_FOUND).await;
        assert_eq!(body["error"], "NOTIFICATION_NOT_FOUND");
    }
}
