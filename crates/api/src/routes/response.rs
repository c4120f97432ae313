//! Response helpers shared by the ledger routes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use poolbank_core::ledger::LedgerError;
use serde_json::{Value as JsonValue, json};
use tracing::error;

/// Wraps a success payload as `{ "ok": true, ...payload }`.
pub fn ok(payload: JsonValue) -> Response {
    let mut body = json!({ "ok": true });
    if let (Some(body), JsonValue::Object(fields)) = (body.as_object_mut(), payload) {
        body.extend(fields);
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// Maps a ledger error to `{ "error": code, "message": text }`.
///
/// Internal faults are logged and reported without detail.
pub fn ledger_error_response(e: &LedgerError) -> Response {
    if e.is_internal() {
        error!(error = %e, code = e.error_code(), "Ledger operation failed");
    }

    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(json!({
            "error": e.error_code(),
            "message": e.public_message()
        })),
    )
        .into_response()
}

/// Shorthand for rejecting a request before it reaches the store.
pub fn validation_error(message: &str) -> Response {
    ledger_error_response(&LedgerError::Validation(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> JsonValue {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_merges_payload() {
        let response = ok(json!({ "account_number": "7700000001" }));
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["account_number"], "7700000001");
    }

    #[rstest]
    #[case(LedgerError::SelfTransfer, StatusCode::BAD_REQUEST, "SELF_TRANSFER")]
    #[case(LedgerError::ReceiverNotFound("77".into()), StatusCode::NOT_FOUND, "RECEIVER_NOT_FOUND")]
    #[case(LedgerError::ConcurrencyConflict, StatusCode::CONFLICT, "CONCURRENCY_CONFLICT")]
    #[case(LedgerError::AccountFrozen { reason: None }, StatusCode::UNPROCESSABLE_ENTITY, "ACCOUNT_FROZEN")]
    #[tokio::test]
    async fn test_error_status_and_code(
        #[case] error: LedgerError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = ledger_error_response(&error);
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"], code);
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let response =
            ledger_error_response(&LedgerError::Database("relation accounts missing".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }
}
