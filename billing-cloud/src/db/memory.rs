//! In-memory billing store for tests
//!
//! Transactions buffer their writes and apply them on commit, so a dropped
//! transaction leaves committed state untouched. Failure points let tests
//! break a specific step.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::billing::{Payment, PaymentStatus, Plan, Subscription, Tenant};

use super::{AuditEntry, BillingStore, BillingTx, DbResult};

#[derive(Default)]
struct Data {
    tenants: HashMap<String, Tenant>,
    plans: HashMap<String, Plan>,
    subscriptions: HashMap<String, Subscription>,
    payments: HashMap<String, Payment>,
    audit: Vec<AuditEntry>,
}

/// Steps that can be made to fail
#[derive(Default)]
pub struct FailPoints {
    pub update_subscription: bool,
    pub list_due: bool,
    pub append_audit: bool,
    /// Tenant lookups for these ids fail
    pub tenant_ids: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Data>>,
    fail: Arc<Mutex<FailPoints>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, f: impl FnOnce(&mut FailPoints)) {
        f(&mut self.fail.lock().unwrap());
    }

    pub fn put_tenant(&self, t: Tenant) {
        self.data.lock().unwrap().tenants.insert(t.id.clone(), t);
    }

    pub fn put_plan(&self, p: Plan) {
        self.data.lock().unwrap().plans.insert(p.id.clone(), p);
    }

    pub fn put_subscription(&self, s: Subscription) {
        self.data
            .lock()
            .unwrap()
            .subscriptions
            .insert(s.id.clone(), s);
    }

    pub fn put_payment(&self, p: Payment) {
        self.data.lock().unwrap().payments.insert(p.id.clone(), p);
    }

    pub fn tenant(&self, id: &str) -> Tenant {
        self.data.lock().unwrap().tenants[id].clone()
    }

    pub fn subscription(&self, id: &str) -> Subscription {
        self.data.lock().unwrap().subscriptions[id].clone()
    }

    pub fn payment(&self, id: &str) -> Payment {
        self.data.lock().unwrap().payments[id].clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        let mut all: Vec<Payment> = self
            .data
            .lock()
            .unwrap()
            .payments
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }

    pub fn audit(&self) -> Vec<AuditEntry> {
        self.data.lock().unwrap().audit.clone()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn find_tenant(&self, id: &str) -> DbResult<Option<Tenant>> {
        if self.fail.lock().unwrap().tenant_ids.contains(id) {
            return Err(format!("tenant lookup failed for {id}").into());
        }
        Ok(self.data.lock().unwrap().tenants.get(id).cloned())
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> DbResult<Option<Tenant>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .tenants
            .values()
            .find(|t| t.subdomain == subdomain)
            .cloned())
    }

    async fn set_tenant_active(&self, tenant_id: &str, active: bool) -> DbResult<()> {
        if let Some(t) = self.data.lock().unwrap().tenants.get_mut(tenant_id) {
            t.is_active = active;
        }
        Ok(())
    }

    async fn find_plan(&self, id: &str) -> DbResult<Option<Plan>> {
        Ok(self.data.lock().unwrap().plans.get(id).cloned())
    }

    async fn find_subscription(&self, id: &str) -> DbResult<Option<Subscription>> {
        Ok(self.data.lock().unwrap().subscriptions.get(id).cloned())
    }

    async fn find_subscription_by_tenant(&self, tenant_id: &str) -> DbResult<Option<Subscription>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> DbResult<Option<Subscription>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_due_subscriptions(&self, now: i64) -> DbResult<Vec<Subscription>> {
        if self.fail.lock().unwrap().list_due {
            return Err("list_due failed".into());
        }
        let mut due: Vec<Subscription> = self
            .data
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| {
                s.status == shared::billing::SubscriptionStatus::Active && s.next_payment_at < now
            })
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_payment_at);
        Ok(due)
    }

    async fn list_payments(&self, subscription_id: &str, limit: i64) -> DbResult<Vec<Payment>> {
        let mut list: Vec<Payment> = self
            .payments()
            .into_iter()
            .filter(|p| p.subscription_id == subscription_id)
            .collect();
        list.reverse();
        list.truncate(limit.max(0) as usize);
        Ok(list)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> DbResult<()> {
        if self.fail.lock().unwrap().append_audit {
            return Err("audit insert failed".into());
        }
        self.data.lock().unwrap().audit.push(entry.clone());
        Ok(())
    }

    async fn begin(&self) -> DbResult<Box<dyn BillingTx>> {
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            subscriptions: HashMap::new(),
            payments: HashMap::new(),
        }))
    }
}

/// Buffered transaction over [`MemoryStore`]
pub struct MemoryTx {
    store: MemoryStore,
    subscriptions: HashMap<String, Subscription>,
    payments: HashMap<String, Payment>,
}

impl MemoryTx {
    fn payment_by(&self, pred: impl Fn(&Payment) -> bool) -> Option<Payment> {
        if let Some(p) = self.payments.values().find(|p| pred(*p)) {
            return Some(p.clone());
        }
        self.store
            .data
            .lock()
            .unwrap()
            .payments
            .values()
            .find(|p| pred(*p) && !self.payments.contains_key(&p.id))
            .cloned()
    }
}

#[async_trait]
impl BillingTx for MemoryTx {
    async fn lock_subscription(&mut self, id: &str) -> DbResult<Option<Subscription>> {
        if let Some(s) = self.subscriptions.get(id) {
            return Ok(Some(s.clone()));
        }
        Ok(self.store.data.lock().unwrap().subscriptions.get(id).cloned())
    }

    async fn lock_payment(&mut self, id: &str) -> DbResult<Option<Payment>> {
        Ok(self.payment_by(|p| p.id == id))
    }

    async fn lock_payment_by_external_id(
        &mut self,
        external_id: &str,
    ) -> DbResult<Option<Payment>> {
        Ok(self.payment_by(|p| p.external_id.as_deref() == Some(external_id)))
    }

    async fn insert_payment(&mut self, payment: &Payment) -> DbResult<()> {
        self.payments.insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn insert_payment_if_absent(&mut self, payment: &Payment) -> DbResult<bool> {
        if let Some(ext) = payment.external_id.as_deref() {
            if self
                .payment_by(|p| p.external_id.as_deref() == Some(ext))
                .is_some()
            {
                return Ok(false);
            }
        }
        self.payments.insert(payment.id.clone(), payment.clone());
        Ok(true)
    }

    async fn update_payment_status(
        &mut self,
        id: &str,
        status: PaymentStatus,
        paid_at: Option<i64>,
    ) -> DbResult<()> {
        let mut p = self
            .payment_by(|p| p.id == id)
            .ok_or_else(|| format!("payment {id} missing"))?;
        p.status = status;
        p.paid_at = paid_at;
        self.payments.insert(p.id.clone(), p);
        Ok(())
    }

    async fn update_subscription(&mut self, sub: &Subscription) -> DbResult<()> {
        if self.store.fail.lock().unwrap().update_subscription {
            return Err("subscription update failed".into());
        }
        self.subscriptions.insert(sub.id.clone(), sub.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryTx {
            store,
            subscriptions,
            payments,
        } = *self;
        let mut data = store.data.lock().unwrap();
        data.subscriptions.extend(subscriptions);
        data.payments.extend(payments);
        Ok(())
    }
}
