//! Audit log operations

use serde::Serialize;
use sqlx::PgExecutor;

/// Audit actions written by the billing core
pub mod action {
    pub const GRACE_STARTED: &str = "grace_started";
    pub const GRACE_EXPIRED: &str = "grace_expired";
    pub const PAYMENT_CONFIRMED: &str = "payment_confirmed";
    pub const PAYMENT_RECORDED: &str = "payment_recorded";
    pub const GATEWAY_CONFIRMED: &str = "gateway_confirmed";
    pub const METHOD_SWITCHED: &str = "method_switched";
    pub const SUBSCRIPTION_CANCELLED: &str = "subscription_cancelled";
    pub const AMOUNT_SYNCED: &str = "amount_synced";
}

/// One audit log row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    pub tenant_id: String,
    pub action: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: i64,
}

/// Write an audit log entry
pub async fn log<'e>(db: impl PgExecutor<'e>, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (tenant_id, action, detail, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&entry.tenant_id)
    .bind(&entry.action)
    .bind(&entry.detail)
    .bind(entry.created_at)
    .execute(db)
    .await?;
    Ok(())
}
