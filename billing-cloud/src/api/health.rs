//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// Service status plus a gateway reachability probe.
///
/// The probe is raced against the gateway timeout; a slow or failing gateway
/// reports `"unknown"` and never fails the health check itself.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let gateway = match tokio::time::timeout(state.settings.gateway_timeout, state.gateway.ping())
        .await
    {
        Ok(Ok(())) => "ok",
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Gateway ping failed");
            "unknown"
        }
        Err(_) => {
            tracing::debug!("Gateway ping timed out");
            "unknown"
        }
    };

    Json(serde_json::json!({
        "status": "ok",
        "service": "billing-cloud",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
        "gateway": gateway,
    }))
}
