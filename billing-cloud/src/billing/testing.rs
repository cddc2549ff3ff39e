//! Fixtures for billing tests: in-memory store, recording gateway and notifier

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::billing::{
    DEFAULT_GRACE_PERIOD_DAYS, Payment, PaymentMethod, PaymentStatus, Plan, PlanFeatures,
    Subscription, SubscriptionStatus, Tenant,
};
use shared::util::DAY_MS;

use crate::db::memory::MemoryStore;
use crate::email::mock::MockNotifier;
use crate::gateway::mock::MockGateway;
use crate::state::{AppState, BillingSettings};

/// 2025-06-15T15:06:40Z
pub const NOW: i64 = 1_750_000_000_000;
pub const DAY: i64 = DAY_MS;

pub const PLAN_ID: &str = "basic";

pub fn plan_price() -> Decimal {
    Decimal::new(100, 0)
}

pub struct Harness {
    pub state: AppState,
    pub store: MemoryStore,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<MockNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let gateway = Arc::new(MockGateway::new());
        let notifier = Arc::new(MockNotifier::new());
        store.put_plan(Plan {
            id: PLAN_ID.into(),
            name: "Basic".into(),
            price: plan_price(),
            billing_cycle: 1,
            features: PlanFeatures::default(),
        });
        let state = AppState {
            store: Arc::new(store.clone()),
            gateway: gateway.clone(),
            notifier: notifier.clone(),
            settings: BillingSettings {
                currency: "ARS".into(),
                sweep_concurrency: 4,
                gateway_timeout: Duration::from_secs(1),
            },
            webhook_secret: String::new(),
            operator_token: "op-token".into(),
        };
        Self {
            state,
            store,
            gateway,
            notifier,
        }
    }

    fn seed_tenant(&self, id: &str) {
        self.store.put_tenant(Tenant {
            id: id.into(),
            subdomain: id.into(),
            is_active: true,
            email: format!("admin@{id}.test"),
        });
    }

    /// Active MANUAL subscription; tenant subdomain equals `tenant_id`
    pub fn seed_manual(
        &self,
        tenant_id: &str,
        next_payment_at: i64,
        grace_started_at: Option<i64>,
    ) -> Subscription {
        self.seed_tenant(tenant_id);
        let sub = Subscription {
            id: format!("sub-{tenant_id}"),
            tenant_id: tenant_id.into(),
            plan_id: Some(PLAN_ID.into()),
            status: SubscriptionStatus::Active,
            payment_method: PaymentMethod::Manual,
            external_id: None,
            next_payment_at,
            grace_started_at,
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            billing_cycle: 1,
            created_at: NOW - 400 * DAY,
            updated_at: NOW - 400 * DAY,
        };
        self.store.put_subscription(sub.clone());
        sub
    }

    /// Active AUTOMATED subscription linked to gateway agreement `external_id`
    pub fn seed_automated(
        &self,
        tenant_id: &str,
        external_id: &str,
        next_payment_at: i64,
    ) -> Subscription {
        let mut sub = self.seed_manual(tenant_id, next_payment_at, None);
        sub.payment_method = PaymentMethod::Automated;
        sub.external_id = Some(external_id.into());
        self.store.put_subscription(sub.clone());
        sub
    }

    /// PENDING manual payment for `sub`'s current cycle
    pub fn seed_pending_payment(&self, sub: &Subscription, id: &str) -> Payment {
        let p = Payment {
            id: id.into(),
            subscription_id: sub.id.clone(),
            amount: plan_price(),
            status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Manual,
            due_date: sub.next_payment_at,
            paid_at: None,
            external_id: None,
            proof_reference: None,
            created_at: NOW - DAY,
        };
        self.store.put_payment(p.clone());
        p
    }
}
