use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_auth::AuthzError;
use stockroom_ledger::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let status = match &err {
        LedgerError::InvalidQuantity(_) | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::UnknownProduct | LedgerError::UnknownEmployee => StatusCode::NOT_FOUND,
        LedgerError::InsufficientStock { .. }
        | LedgerError::MissingSignature
        | LedgerError::ReturnExceedsDelivered { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::DuplicateProductCode(_)
        | LedgerError::ConcurrentUpdateConflict { .. }
        | LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "ledger operation failed");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
