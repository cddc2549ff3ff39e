//! Tenant billing notifications
//!
//! Notifications are best-effort: callers log failures and carry on.

pub mod templates;

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Notification sender
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), BoxError>;
}

/// SES-backed sender
pub struct SesNotifier {
    ses: SesClient,
    from: String,
}

impl SesNotifier {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), BoxError> {
        let subject = Content::builder().data(subject).build()?;
        let body = Body::builder()
            .text(Content::builder().data(body).build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(to = to, "Billing email sent");
        Ok(())
    }
}

/// Send a rendered template, logging instead of failing.
///
/// Returns the failure text so operator actions can surface it as a warning.
pub async fn notify(
    notifier: &dyn Notifier,
    to: &str,
    email: &templates::Email,
) -> Option<String> {
    match notifier.send(to, &email.subject, &email.body).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(to = to, subject = %email.subject, error = %e, "Billing email not sent");
            Some(format!("Notification to {to} failed: {e}"))
        }
    }
}
