//! PostgreSQL-backed billing store

use async_trait::async_trait;
use shared::billing::{Payment, PaymentStatus, Plan, Subscription, Tenant};
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    AuditEntry, BillingStore, BillingTx, DbResult, audit, payments, plans, subscriptions, tenants,
};

#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn find_tenant(&self, id: &str) -> DbResult<Option<Tenant>> {
        Ok(tenants::find_by_id(&self.pool, id).await?)
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> DbResult<Option<Tenant>> {
        Ok(tenants::find_by_subdomain(&self.pool, subdomain).await?)
    }

    async fn set_tenant_active(&self, tenant_id: &str, active: bool) -> DbResult<()> {
        Ok(tenants::set_active(&self.pool, tenant_id, active).await?)
    }

    async fn find_plan(&self, id: &str) -> DbResult<Option<Plan>> {
        Ok(plans::find_by_id(&self.pool, id).await?)
    }

    async fn find_subscription(&self, id: &str) -> DbResult<Option<Subscription>> {
        Ok(subscriptions::find_by_id(&self.pool, id).await?)
    }

    async fn find_subscription_by_tenant(&self, tenant_id: &str) -> DbResult<Option<Subscription>> {
        Ok(subscriptions::find_by_tenant(&self.pool, tenant_id).await?)
    }

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> DbResult<Option<Subscription>> {
        Ok(subscriptions::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn list_due_subscriptions(&self, now: i64) -> DbResult<Vec<Subscription>> {
        Ok(subscriptions::list_due(&self.pool, now).await?)
    }

    async fn list_payments(&self, subscription_id: &str, limit: i64) -> DbResult<Vec<Payment>> {
        Ok(payments::list_for_subscription(&self.pool, subscription_id, limit).await?)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> DbResult<()> {
        Ok(audit::log(&self.pool, entry).await?)
    }

    async fn begin(&self) -> DbResult<Box<dyn BillingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBillingTx { tx }))
    }
}

/// Open PostgreSQL transaction; rolled back on drop unless committed
pub struct PgBillingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTx for PgBillingTx {
    async fn lock_subscription(&mut self, id: &str) -> DbResult<Option<Subscription>> {
        Ok(subscriptions::lock_by_id(&mut *self.tx, id).await?)
    }

    async fn lock_payment(&mut self, id: &str) -> DbResult<Option<Payment>> {
        Ok(payments::lock_by_id(&mut *self.tx, id).await?)
    }

    async fn lock_payment_by_external_id(
        &mut self,
        external_id: &str,
    ) -> DbResult<Option<Payment>> {
        Ok(payments::lock_by_external_id(&mut *self.tx, external_id).await?)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> DbResult<()> {
        Ok(payments::insert(&mut *self.tx, payment).await?)
    }

    async fn insert_payment_if_absent(&mut self, payment: &Payment) -> DbResult<bool> {
        Ok(payments::insert_if_absent(&mut *self.tx, payment).await?)
    }

    async fn update_payment_status(
        &mut self,
        id: &str,
        status: PaymentStatus,
        paid_at: Option<i64>,
    ) -> DbResult<()> {
        Ok(payments::update_status(&mut *self.tx, id, status, paid_at).await?)
    }

    async fn update_subscription(&mut self, sub: &Subscription) -> DbResult<()> {
        Ok(subscriptions::update(&mut *self.tx, sub).await?)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
