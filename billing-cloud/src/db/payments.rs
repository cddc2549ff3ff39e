use shared::billing::{Payment, PaymentStatus};
use sqlx::PgExecutor;

const COLUMNS: &str = "id, subscription_id, amount, status, payment_method, due_date, paid_at, \
     external_id, proof_reference, created_at";

const INSERT: &str = "INSERT INTO payments
    (id, subscription_id, amount, status, payment_method, due_date, paid_at,
     external_id, proof_reference, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

pub async fn lock_by_id<'e>(db: impl PgExecutor<'e>, id: &str) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn lock_by_external_id<'e>(
    db: impl PgExecutor<'e>,
    external_id: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {COLUMNS} FROM payments WHERE external_id = $1 FOR UPDATE"
    ))
    .bind(external_id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_subscription<'e>(
    db: impl PgExecutor<'e>,
    subscription_id: &str,
    limit: i64,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {COLUMNS} FROM payments WHERE subscription_id = $1
         ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(subscription_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

fn bind_insert<'q>(
    sql: &'q str,
    p: &'q Payment,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(sql)
        .bind(&p.id)
        .bind(&p.subscription_id)
        .bind(p.amount)
        .bind(p.status.as_db())
        .bind(p.payment_method.as_db())
        .bind(p.due_date)
        .bind(p.paid_at)
        .bind(&p.external_id)
        .bind(&p.proof_reference)
        .bind(p.created_at)
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, p: &Payment) -> Result<(), sqlx::Error> {
    bind_insert(INSERT, p).execute(db).await?;
    Ok(())
}

/// Idempotent insert keyed on the gateway payment id.
///
/// Returns `true` when this call inserted the row.
pub async fn insert_if_absent<'e>(db: impl PgExecutor<'e>, p: &Payment) -> Result<bool, sqlx::Error> {
    let sql = format!("{INSERT} ON CONFLICT (external_id) DO NOTHING");
    let result = bind_insert(&sql, p).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_status<'e>(
    db: impl PgExecutor<'e>,
    id: &str,
    status: PaymentStatus,
    paid_at: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET status = $1, paid_at = $2 WHERE id = $3")
        .bind(status.as_db())
        .bind(paid_at)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
