use shared::billing::Plan;
use sqlx::PgExecutor;

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: &str) -> Result<Option<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(
        "SELECT id, name, price, billing_cycle, features FROM plans WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}
