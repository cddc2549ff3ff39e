//! Operator billing actions
//!
//! Actions answer 200 with an [`ActionResult`]; business failures come back as
//! `success: false` with a message the console can show as-is.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::billing::ActionResult;

use crate::billing::lifecycle::{self, BillingOverview, SubscriptionLookup};
use crate::billing::settlement;
use crate::billing::sweep::{self, SweepReport};
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

type ActionResponse = Json<ActionResult>;

/// Log and flatten a failed action
fn failed(operation: &str, err: ServiceError) -> ActionResponse {
    match &err {
        ServiceError::Db(e) => {
            tracing::error!(operation = operation, error = %e, "Billing action failed");
        }
        ServiceError::App(e) => {
            tracing::info!(operation = operation, code = %e.code, error = %e.message, "Billing action rejected");
        }
    }
    Json(ActionResult::failed(err.operator_message()))
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    #[serde(flatten)]
    pub result: ActionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
}

/// POST /api/billing/sweep
pub async fn run_sweep(State(state): State<AppState>) -> Json<SweepResponse> {
    let now = shared::util::now_millis();
    match sweep::run_sweep(&state, now).await {
        Ok(report) => {
            let result = if report.failed == 0 {
                ActionResult::ok()
            } else {
                ActionResult::failed(format!(
                    "{} of {} subscriptions failed",
                    report.failed, report.due
                ))
            };
            Json(SweepResponse {
                result,
                report: Some(report),
            })
        }
        Err(e) => Json(SweepResponse {
            result: failed("sweep", e).0,
            report: None,
        }),
    }
}

/// POST /api/billing/payments/{id}/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> ActionResponse {
    let now = shared::util::now_millis();
    match settlement::mark_paid(&state, &payment_id, now).await {
        Ok(s) => Json(
            ActionResult::ok()
                .with_subscription(s.subscription)
                .with_warning(s.warning),
        ),
        Err(e) => failed("mark_paid", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckSubscriptionRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// POST /api/billing/subscriptions/check
pub async fn check_subscription(
    State(state): State<AppState>,
    Json(req): Json<CheckSubscriptionRequest>,
) -> ActionResponse {
    let lookup = match (req.subscription_id, req.external_id) {
        (Some(id), _) if !id.is_empty() => SubscriptionLookup::Id(id),
        (_, Some(ext)) if !ext.is_empty() => SubscriptionLookup::ExternalId(ext),
        _ => return Json(ActionResult::failed("subscription_id or external_id is required")),
    };
    let now = shared::util::now_millis();
    match lifecycle::check_subscription(&state, &lookup, now).await {
        Ok(sync) => Json(
            ActionResult::ok()
                .with_subscription(sync.subscription)
                .with_redirect(sync.redirect_url),
        ),
        Err(e) => failed("check_subscription", e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AutomateRequest {
    /// Payer email; the tenant's contact email when blank
    #[serde(default)]
    pub email: String,
}

/// POST /api/billing/tenants/{subdomain}/automate
pub async fn switch_to_automated(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
    Json(req): Json<AutomateRequest>,
) -> ActionResponse {
    let now = shared::util::now_millis();
    match lifecycle::switch_to_automated(&state, &subdomain, &req.email, now).await {
        Ok(sync) => Json(
            ActionResult::ok()
                .with_subscription(sync.subscription)
                .with_redirect(sync.redirect_url),
        ),
        Err(e) => failed("switch_to_automated", e),
    }
}

/// POST /api/billing/tenants/{subdomain}/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ActionResponse {
    let now = shared::util::now_millis();
    match lifecycle::cancel_subscription(&state, &subdomain, now).await {
        Ok((sub, warning)) => Json(
            ActionResult::ok()
                .with_subscription(sub)
                .with_warning(warning),
        ),
        Err(e) => failed("cancel_subscription", e),
    }
}

/// POST /api/billing/tenants/{subdomain}/sync-amount
pub async fn sync_plan_amount(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ActionResponse {
    let now = shared::util::now_millis();
    match lifecycle::sync_plan_amount(&state, &subdomain, now).await {
        Ok(sub) => Json(ActionResult::ok().with_subscription(sub)),
        Err(e) => failed("sync_plan_amount", e),
    }
}

/// GET /api/billing/tenants/{subdomain}
pub async fn billing_overview(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ServiceResult<Json<BillingOverview>> {
    let now = shared::util::now_millis();
    let overview = lifecycle::billing_overview(&state, &subdomain, now).await?;
    Ok(Json(overview))
}
