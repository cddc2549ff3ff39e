//! Database access layer
//!
//! Per-table query modules operate on any `PgExecutor` (pool or open
//! transaction). The billing core only sees [`BillingStore`] / [`BillingTx`];
//! [`PgBillingStore`] wires those traits to the query modules.

pub mod audit;
pub mod payments;
pub mod plans;
pub mod postgres;
pub mod subscriptions;
pub mod tenants;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::billing::{Payment, PaymentStatus, Plan, Subscription, Tenant};

pub use audit::AuditEntry;
pub use postgres::PgBillingStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type DbResult<T> = Result<T, BoxError>;

/// Billing persistence
///
/// Reads outside a transaction see committed state only. Every multi-row
/// mutation goes through [`BillingStore::begin`].
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_tenant(&self, id: &str) -> DbResult<Option<Tenant>>;

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> DbResult<Option<Tenant>>;

    async fn set_tenant_active(&self, tenant_id: &str, active: bool) -> DbResult<()>;

    async fn find_plan(&self, id: &str) -> DbResult<Option<Plan>>;

    async fn find_subscription(&self, id: &str) -> DbResult<Option<Subscription>>;

    async fn find_subscription_by_tenant(&self, tenant_id: &str) -> DbResult<Option<Subscription>>;

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> DbResult<Option<Subscription>>;

    /// ACTIVE subscriptions whose next payment is strictly before `now`
    async fn list_due_subscriptions(&self, now: i64) -> DbResult<Vec<Subscription>>;

    /// Most recent payments first
    async fn list_payments(&self, subscription_id: &str, limit: i64) -> DbResult<Vec<Payment>>;

    async fn append_audit(&self, entry: &AuditEntry) -> DbResult<()>;

    /// Open a transaction scoped to the rows it locks
    async fn begin(&self) -> DbResult<Box<dyn BillingTx>>;
}

/// Open billing transaction
///
/// Dropping without [`BillingTx::commit`] rolls back every write.
#[async_trait]
pub trait BillingTx: Send {
    /// Read and row-lock a subscription
    async fn lock_subscription(&mut self, id: &str) -> DbResult<Option<Subscription>>;

    /// Read and row-lock a payment
    async fn lock_payment(&mut self, id: &str) -> DbResult<Option<Payment>>;

    /// Read and row-lock a payment by gateway payment id
    async fn lock_payment_by_external_id(&mut self, external_id: &str)
    -> DbResult<Option<Payment>>;

    async fn insert_payment(&mut self, payment: &Payment) -> DbResult<()>;

    /// Insert unless a row with the same `external_id` exists.
    ///
    /// Returns `true` when a row was inserted.
    async fn insert_payment_if_absent(&mut self, payment: &Payment) -> DbResult<bool>;

    async fn update_payment_status(
        &mut self,
        id: &str,
        status: PaymentStatus,
        paid_at: Option<i64>,
    ) -> DbResult<()>;

    /// Persist the mutable subscription fields
    async fn update_subscription(&mut self, sub: &Subscription) -> DbResult<()>;

    async fn commit(self: Box<Self>) -> DbResult<()>;
}
