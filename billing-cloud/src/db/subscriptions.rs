use shared::billing::Subscription;
use sqlx::PgExecutor;

const COLUMNS: &str = "id, tenant_id, plan_id, status, payment_method, external_id, \
     next_payment_at, grace_started_at, grace_period_days, billing_cycle, created_at, updated_at";

pub async fn find_by_id<'e>(
    db: impl PgExecutor<'e>,
    id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn lock_by_id<'e>(
    db: impl PgExecutor<'e>,
    id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_tenant<'e>(
    db: impl PgExecutor<'e>,
    tenant_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE tenant_id = $1"
    ))
    .bind(tenant_id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_external_id<'e>(
    db: impl PgExecutor<'e>,
    external_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(db)
    .await
}

/// ACTIVE and past due, oldest first
pub async fn list_due<'e>(
    db: impl PgExecutor<'e>,
    now: i64,
) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions
         WHERE status = 'ACTIVE' AND next_payment_at < $1
         ORDER BY next_payment_at"
    ))
    .bind(now)
    .fetch_all(db)
    .await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, sub: &Subscription) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE subscriptions SET
            plan_id = $1, status = $2, payment_method = $3, external_id = $4,
            next_payment_at = $5, grace_started_at = $6, grace_period_days = $7,
            billing_cycle = $8, updated_at = $9
         WHERE id = $10",
    )
    .bind(&sub.plan_id)
    .bind(sub.status.as_db())
    .bind(sub.payment_method.as_db())
    .bind(&sub.external_id)
    .bind(sub.next_payment_at)
    .bind(sub.grace_started_at)
    .bind(sub.grace_period_days)
    .bind(sub.billing_cycle)
    .bind(sub.updated_at)
    .bind(&sub.id)
    .execute(db)
    .await?;
    Ok(())
}
