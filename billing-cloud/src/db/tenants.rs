use shared::billing::Tenant;
use sqlx::PgExecutor;

const COLUMNS: &str = "id, subdomain, is_active, email";

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: &str) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(&format!("SELECT {COLUMNS} FROM tenants WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_subdomain<'e>(
    db: impl PgExecutor<'e>,
    subdomain: &str,
) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(&format!(
        "SELECT {COLUMNS} FROM tenants WHERE subdomain = $1"
    ))
    .bind(subdomain)
    .fetch_optional(db)
    .await
}

pub async fn set_active<'e>(
    db: impl PgExecutor<'e>,
    tenant_id: &str,
    active: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tenants SET is_active = $1 WHERE id = $2")
        .bind(active)
        .bind(tenant_id)
        .execute(db)
        .await?;
    Ok(())
}
