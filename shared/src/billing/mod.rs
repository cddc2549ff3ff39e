//! Billing domain types shared between the billing service and its console

pub mod action;
pub mod grace;
pub mod payment;
pub mod subscription;
pub mod tenant;

pub use action::ActionResult;
pub use grace::{GraceStatus, grace_period_status};
pub use payment::{Payment, PaymentStatus};
pub use subscription::{PaymentMethod, Subscription, SubscriptionStatus};
pub use tenant::{Plan, PlanFeatures, Tenant};

/// Default grace period for new subscriptions
pub const DEFAULT_GRACE_PERIOD_DAYS: i32 = 15;
