//! Operator action result envelope

use serde::{Deserialize, Serialize};

use super::subscription::Subscription;

/// Result of an operator-facing billing action.
///
/// Business failures are reported here with `success: false` instead of a
/// non-2xx response, so the console can render the message as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal problem the operator should know about (e.g. email not sent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Gateway hosted authorization page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    pub fn with_redirect(mut self, url: Option<String>) -> Self {
        self.redirect_url = url;
        self
    }

    pub fn with_subscription(mut self, sub: Subscription) -> Self {
        self.subscription = Some(sub);
        self
    }
}
