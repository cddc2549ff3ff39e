//! Payment gateway integration via REST API (no SDK dependency)

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{CreateRecurring, GatewayError, GatewayPayment, PaymentGateway, RecurringPayment};

/// REST client for the recurring-payment provider.
///
/// Constructed once at startup and shared through `AppState`.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    back_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        access_token: &str,
        back_url: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            back_url: back_url.to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request raced against the configured timeout and decode JSON.
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let req = req.bearer_auth(&self.access_token);
        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(GatewayError::Timeout),
            Ok(Err(e)) => return Err(GatewayError::Transport(e.to_string())),
            Err(_) => return Err(GatewayError::Timeout),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

// ── Wire formats ──

#[derive(Deserialize)]
struct PreapprovalWire {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    status: String,
    next_payment_date: Option<String>,
    init_point: Option<String>,
}

impl From<PreapprovalWire> for RecurringPayment {
    fn from(w: PreapprovalWire) -> Self {
        RecurringPayment {
            id: w.id,
            status: w.status,
            next_payment_date: w.next_payment_date.as_deref().and_then(parse_gateway_date),
            init_point: w.init_point,
        }
    }
}

#[derive(Deserialize)]
struct PaymentWire {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    transaction_amount: Decimal,
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default)]
    point_of_interaction: serde_json::Value,
}

impl From<PaymentWire> for GatewayPayment {
    fn from(w: PaymentWire) -> Self {
        let related = w.point_of_interaction["transaction_data"]["subscription_id"]
            .as_str()
            .or_else(|| w.metadata["preapproval_id"].as_str())
            .map(String::from);
        GatewayPayment {
            id: w.id,
            status: w.status,
            amount: w.transaction_amount,
            related_recurring_id: related,
        }
    }
}

/// Gateway ids arrive as either JSON strings or numbers
fn id_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

/// Gateway dates are RFC 3339 with offset
fn parse_gateway_date(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.timestamp_millis())
}

fn amount_json(amount: Decimal) -> serde_json::Value {
    amount
        .to_f64()
        .map(serde_json::Value::from)
        .unwrap_or(serde_json::Value::Null)
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_recurring_payment(
        &self,
        req: &CreateRecurring,
    ) -> Result<RecurringPayment, GatewayError> {
        let body = serde_json::json!({
            "reason": req.reason,
            "external_reference": req.external_reference,
            "payer_email": req.payer_email,
            "back_url": self.back_url,
            "status": "pending",
            "auto_recurring": {
                "frequency": req.frequency_months,
                "frequency_type": "months",
                "transaction_amount": amount_json(req.amount),
                "currency_id": req.currency,
            },
        });
        let wire: PreapprovalWire = self
            .send(self.http.post(self.url("/preapproval")).json(&body), "preapproval")
            .await?;
        tracing::info!(preapproval_id = %wire.id, status = %wire.status, "Recurring payment created");
        Ok(wire.into())
    }

    async fn get_recurring_payment(&self, id: &str) -> Result<RecurringPayment, GatewayError> {
        let wire: PreapprovalWire = self
            .send(self.http.get(self.url(&format!("/preapproval/{id}"))), id)
            .await?;
        Ok(wire.into())
    }

    async fn update_recurring_payment_amount(
        &self,
        id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        let body = serde_json::json!({
            "auto_recurring": { "transaction_amount": amount_json(amount) },
        });
        let _: serde_json::Value = self
            .send(
                self.http.put(self.url(&format!("/preapproval/{id}"))).json(&body),
                id,
            )
            .await?;
        Ok(())
    }

    async fn cancel_recurring_payment(&self, id: &str) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "status": "cancelled" });
        let _: serde_json::Value = self
            .send(
                self.http.put(self.url(&format!("/preapproval/{id}"))).json(&body),
                id,
            )
            .await?;
        Ok(())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        let wire: PaymentWire = self
            .send(
                self.http.get(self.url(&format!("/v1/payments/{payment_id}"))),
                payment_id,
            )
            .await?;
        Ok(wire.into())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        let _: serde_json::Value = self.send(self.http.get(self.url("/users/me")), "me").await?;
        Ok(())
    }
}
