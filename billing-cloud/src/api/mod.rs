//! API routes for billing-cloud

pub mod billing;
pub mod health;
pub mod webhook;

use crate::auth::operator_auth::operator_auth_middleware;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Operator actions (bearer token)
    let operator = Router::new()
        .route("/api/billing/sweep", post(billing::run_sweep))
        .route(
            "/api/billing/payments/{id}/mark-paid",
            post(billing::mark_paid),
        )
        .route(
            "/api/billing/subscriptions/check",
            post(billing::check_subscription),
        )
        .route(
            "/api/billing/tenants/{subdomain}",
            get(billing::billing_overview),
        )
        .route(
            "/api/billing/tenants/{subdomain}/automate",
            post(billing::switch_to_automated),
        )
        .route(
            "/api/billing/tenants/{subdomain}/cancel",
            post(billing::cancel_subscription),
        )
        .route(
            "/api/billing/tenants/{subdomain}/sync-amount",
            post(billing::sync_plan_amount),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            operator_auth_middleware,
        ));

    // Gateway webhook (signature-verified, raw body)
    let webhook = Router::new().route("/webhooks/gateway", post(webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(operator)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
