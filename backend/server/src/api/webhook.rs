//! Payment provider webhook.
//!
//! When `STRIPE_WEBHOOK_SECRET` is set, the `Stripe-Signature` header
//! (`t=<unix>,v1=<hex>`) must carry an HMAC-SHA256 of `"{t}.{body}"` made
//! with that secret, and `t` must be within [`SIGNATURE_TOLERANCE_SECS`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use crowdfund_core::DonationStatus;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

use super::{done, AppState, Reply};
use crate::db::now;
use crate::errors::{ApiError, ApiResult};
use crate::services::settlement;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

/// Check a `t=…,v1=…` header against `payload`. Any one matching `v1` passes.
pub fn verify_signature(header: &str, payload: &[u8], secret: &str, now: i64) -> bool {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let Some(ts) = timestamp else {
        return false;
    };
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    candidates.into_iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(ts.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    })
}

/// `POST /webhook/stripe`
pub async fn stripe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Reply<()>> {
    if let Some(secret) = &state.config.stripe_webhook_secret {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(header, &body, secret, now()) {
            warn!("Payment webhook signature verification failed");
            return Err(ApiError::Unauthorized("Invalid webhook signature".to_string()));
        }
    }

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid webhook payload: {e}")))?;

    let status = match event.kind.as_str() {
        "payment_intent.succeeded" => DonationStatus::Success,
        "payment_intent.payment_failed" => DonationStatus::Failed,
        other => {
            info!("Ignoring payment webhook event {other}");
            return Ok(done("Event ignored"));
        }
    };
    let Some(intent_id) = event.data.object.get("id").and_then(Value::as_str) else {
        return Err(ApiError::Validation(
            "Webhook payload has no payment intent id".to_string(),
        ));
    };

    match settlement::apply_payment_outcome(&state, intent_id, status).await? {
        Some(_) => Ok(done("Donation updated")),
        None => {
            warn!("Payment webhook for unknown intent {intent_id}");
            Ok(done("No donation for this payment intent"))
        }
    }
}

/// Build a `Stripe-Signature` header value for `payload`.
#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str, ts: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{ts}.").as_bytes());
    mac.update(payload);
    format!("t={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
