//! Billing email texts (Spanish / English)

use rust_decimal::Decimal;

/// Rendered email
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

fn date(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into())
}

pub fn grace_started(amount: Decimal, due_date: i64, grace_days: i32) -> Email {
    let due = date(due_date);
    Email {
        subject: "Pago pendiente / Payment due".into(),
        body: format!(
            "No recibimos el pago de ${amount} con vencimiento {due}.\n\
             Tu sitio seguirá activo durante {grace_days} días mientras regularizas el pago.\n\n\
             We have not received your payment of ${amount} due on {due}.\n\
             Your site stays online for {grace_days} days while you settle it."
        ),
    }
}

pub fn grace_reminder(days_remaining: i64, ends_at: Option<i64>) -> Email {
    let ends = ends_at.map(date).unwrap_or_else(|| "-".into());
    Email {
        subject: "Recordatorio de pago / Payment reminder".into(),
        body: format!(
            "Quedan {days_remaining} días de período de gracia (hasta {ends}).\n\
             Después de esa fecha tu sitio será desactivado.\n\n\
             {days_remaining} days of grace period remain (until {ends}).\n\
             After that date your site will be deactivated."
        ),
    }
}

pub fn deactivated(subdomain: &str) -> Email {
    Email {
        subject: "Sitio desactivado / Site deactivated".into(),
        body: format!(
            "El período de gracia terminó y el sitio \"{subdomain}\" fue desactivado.\n\
             Contáctanos para reactivarlo.\n\n\
             The grace period has ended and the site \"{subdomain}\" has been deactivated.\n\
             Contact us to reactivate it."
        ),
    }
}

pub fn payment_confirmed(amount: Decimal, next_payment_at: i64) -> Email {
    let next = date(next_payment_at);
    Email {
        subject: "Pago confirmado / Payment confirmed".into(),
        body: format!(
            "Confirmamos tu pago de ${amount}. Próximo vencimiento: {next}.\n\n\
             Your payment of ${amount} has been confirmed. Next payment due: {next}."
        ),
    }
}

pub fn subscription_cancelled(subdomain: &str) -> Email {
    Email {
        subject: "Suscripción cancelada / Subscription cancelled".into(),
        body: format!(
            "La suscripción del sitio \"{subdomain}\" fue cancelada.\n\n\
             The subscription for \"{subdomain}\" has been cancelled."
        ),
    }
}
