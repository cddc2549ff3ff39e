//! Operator bearer-token authentication for billing actions

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// Middleware that checks `Authorization: Bearer <OPERATOR_TOKEN>`
pub async fn operator_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_response("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| error_response("Invalid Authorization format"))?;

    if !token_matches(token, &state.operator_token) {
        tracing::warn!("Rejected operator request with invalid token");
        return Err(error_response("Invalid operator token"));
    }

    Ok(next.run(request).await)
}

/// Compare digests so the check does not short-circuit on the first byte
fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && Sha256::digest(presented) == Sha256::digest(expected)
}

fn error_response(message: &str) -> Response {
    AppError::with_message(ErrorCode::NotAuthenticated, message).into_response()
}
