//! Recording gateway double for billing tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{CreateRecurring, GatewayError, GatewayPayment, PaymentGateway, RecurringPayment};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Create(CreateRecurring),
    Get(String),
    UpdateAmount(String, Decimal),
    Cancel(String),
    GetPayment(String),
    Ping,
}

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    recurring: Mutex<HashMap<String, RecurringPayment>>,
    payments: Mutex<HashMap<String, GatewayPayment>>,
    /// Response for the next `create_recurring_payment`
    created: Mutex<Option<RecurringPayment>>,
    /// When set, every call fails with this error
    failure: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_recurring(&self, rp: RecurringPayment) {
        self.recurring.lock().unwrap().insert(rp.id.clone(), rp);
    }

    pub fn put_payment(&self, p: GatewayPayment) {
        self.payments.lock().unwrap().insert(p.id.clone(), p);
    }

    pub fn on_create(&self, rp: RecurringPayment) {
        *self.created.lock().unwrap() = Some(rp);
    }

    pub fn fail_with(&self, err: GatewayError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_recurring_payment(
        &self,
        req: &CreateRecurring,
    ) -> Result<RecurringPayment, GatewayError> {
        self.record(GatewayCall::Create(req.clone()))?;
        let rp = self
            .created
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| RecurringPayment {
                id: format!("pre-{}", req.external_reference),
                status: "pending".into(),
                next_payment_date: None,
                init_point: Some(format!(
                    "https://gateway.test/authorize/{}",
                    req.external_reference
                )),
            });
        self.put_recurring(rp.clone());
        Ok(rp)
    }

    async fn get_recurring_payment(&self, id: &str) -> Result<RecurringPayment, GatewayError> {
        self.record(GatewayCall::Get(id.to_string()))?;
        self.recurring
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn update_recurring_payment_amount(
        &self,
        id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::UpdateAmount(id.to_string(), amount))
    }

    async fn cancel_recurring_payment(&self, id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Cancel(id.to_string()))?;
        if let Some(rp) = self.recurring.lock().unwrap().get_mut(id) {
            rp.status = "cancelled".into();
        }
        Ok(())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        self.record(GatewayCall::GetPayment(payment_id.to_string()))?;
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(payment_id.to_string()))
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.record(GatewayCall::Ping)
    }
}
