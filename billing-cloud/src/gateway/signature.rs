//! Webhook signature verification (HMAC-SHA256)
//!
//! The gateway sends `x-signature: ts=<unix secs>,v1=<hex hmac>` and an
//! `x-request-id` header. The signed manifest is
//! `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Maximum accepted age of a signed notification
const MAX_SKEW_SECS: u64 = 300;

/// Build the string the gateway signs
pub fn manifest(data_id: &str, request_id: &str, ts: &str) -> String {
    format!("id:{data_id};request-id:{request_id};ts:{ts};")
}

/// Verify a webhook signature header against the shared secret.
///
/// `now_secs` is the current unix time in seconds.
pub fn verify_webhook_signature(
    sig_header: &str,
    request_id: &str,
    data_id: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("ts=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid x-signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(manifest(data_id, request_id, timestamp).as_bytes());

    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Gateway timestamps may be seconds or milliseconds
    let mut ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if ts > 10_000_000_000 {
        ts /= 1000;
    }
    if now_secs.abs_diff(ts) > MAX_SKEW_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
pub fn sign(data_id: &str, request_id: &str, ts: i64, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(manifest(data_id, request_id, &ts.to_string()).as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
