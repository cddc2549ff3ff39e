//! Payment gateway webhook
//!
//! POST /webhooks/gateway. Unrelated event types are acknowledged so the
//! gateway does not redeliver them.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shared::error::ErrorCode;

use crate::billing::reconcile::{self, WebhookEvent};
use crate::error::ServiceError;
use crate::gateway::signature;
use crate::state::AppState;

type WebhookResponse = (StatusCode, Json<Value>);

fn ack() -> WebhookResponse {
    (StatusCode::OK, Json(json!({ "success": true })))
}

fn reject(status: StatusCode, code: ErrorCode, message: &str) -> WebhookResponse {
    (
        status,
        Json(json!({ "success": false, "code": code.code(), "error": message })),
    )
}

fn invalid_payload(message: &str) -> WebhookResponse {
    reject(StatusCode::BAD_REQUEST, ErrorCode::WebhookPayloadInvalid, message)
}

/// Handle a gateway notification
///
/// Raw body so the payload can be rejected as malformed before any work.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(ev) => ev,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return invalid_payload("Invalid JSON payload");
        }
    };
    let data_id = event.data_id();

    if !state.webhook_secret.is_empty() {
        let sig_header = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let now_secs = chrono::Utc::now().timestamp();
        if let Err(e) = signature::verify_webhook_signature(
            sig_header,
            request_id,
            data_id.as_deref().unwrap_or(""),
            &state.webhook_secret,
            now_secs,
        ) {
            tracing::warn!(error = e, "Webhook signature verification failed");
            return reject(
                StatusCode::BAD_REQUEST,
                ErrorCode::WebhookSignatureInvalid,
                ErrorCode::WebhookSignatureInvalid.message(),
            );
        }
    }

    tracing::info!(
        event_type = event.kind.as_deref().unwrap_or(""),
        action = event.action.as_deref().unwrap_or(""),
        "Received gateway webhook"
    );

    if !event.is_payment_event() {
        tracing::debug!("Unhandled webhook event, acknowledging");
        return ack();
    }

    let Some(payment_id) = data_id else {
        tracing::warn!("Payment webhook missing data.id");
        return invalid_payload("Missing data.id");
    };

    let now = shared::util::now_millis();
    match reconcile::sync_gateway_payment(&state, &payment_id, now).await {
        Ok(outcome) => {
            tracing::info!(payment_id = %payment_id, outcome = ?outcome, "Webhook processed");
            ack()
        }
        // Only a payment id the gateway disowns is the sender's fault
        Err(ServiceError::App(e)) if e.code == ErrorCode::GatewayResourceNotFound => {
            tracing::warn!(payment_id = %payment_id, error = %e.message, "Webhook references unknown gateway payment");
            reject(StatusCode::BAD_REQUEST, e.code, &e.message)
        }
        Err(e) => {
            tracing::error!(payment_id = %payment_id, error = %e, "Webhook processing failed");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                ErrorCode::InternalError.message(),
            )
        }
    }
}
