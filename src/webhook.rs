//! Payment webhook: signature verification and post-sale side effects.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use ring::hmac;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::model::SoldRecord;
use crate::response::HandlerResponse;
use crate::sold::SoldRecordSink;
use crate::stripe::LISTING_ID_KEY;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
/// Maximum age of a signed timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Something that can kick off a storefront rebuild.
#[async_trait]
pub trait RebuildTrigger: Send + Sync {
    async fn trigger(&self) -> Result<()>;
}

/// Deploy hook: an empty POST to a configured URL.
#[derive(Clone)]
pub struct DeployHook {
    http: Client,
    url: String,
}

impl fmt::Debug for DeployHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployHook").finish_non_exhaustive()
    }
}

impl DeployHook {
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl RebuildTrigger for DeployHook {
    async fn trigger(&self) -> Result<()> {
        let res = self.http.post(&self.url).send().await?;
        let status = res.status();
        info!(%status, "deploy hook triggered");
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::Upstream { status, body });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub payload: &'a str,
    pub signature: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Deserialize, Debug)]
struct EventData {
    object: Value,
}

#[derive(Deserialize, Debug)]
struct CompletedSession {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    amount_total: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct CustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

/// Verify `header` (`t=<unix>,v1=<hex>[,v1=<hex>...]`) against `payload`.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let Some(timestamp) = timestamp else {
        return Err(SyncError::Signature(
            "unable to extract timestamp from header".into(),
        ));
    };
    if signatures.is_empty() {
        return Err(SyncError::Signature("no v1 signatures in header".into()));
    }

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let signed = format!("{}.{}", timestamp, payload);
    let matched = signatures.iter().any(|sig| {
        decode_hex(sig).map_or(false, |tag| hmac::verify(&key, signed.as_bytes(), &tag).is_ok())
    });
    if !matched {
        return Err(SyncError::Signature(
            "no signatures found matching the expected signature".into(),
        ));
    }

    if now.timestamp() - timestamp > tolerance_secs {
        return Err(SyncError::Signature(
            "timestamp outside the tolerance zone".into(),
        ));
    }
    Ok(())
}

/// Build a signature header for `payload`, as the provider would.
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, encode_hex(tag.as_ref()))
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

/// Handle one webhook delivery. Nothing is written and no rebuild happens
/// unless the signature checks out.
#[instrument(skip_all)]
pub async fn handle_webhook(
    request: WebhookRequest<'_>,
    secret: &str,
    sink: &dyn SoldRecordSink,
    rebuild: Option<&dyn RebuildTrigger>,
) -> HandlerResponse {
    handle_webhook_at(request, secret, sink, rebuild, Utc::now()).await
}

pub async fn handle_webhook_at(
    request: WebhookRequest<'_>,
    secret: &str,
    sink: &dyn SoldRecordSink,
    rebuild: Option<&dyn RebuildTrigger>,
    now: DateTime<Utc>,
) -> HandlerResponse {
    let Some(signature) = request.signature else {
        return HandlerResponse::text(StatusCode::BAD_REQUEST, "Missing stripe-signature header");
    };

    if let Err(err) = verify_signature(
        request.payload,
        signature,
        secret,
        now,
        SIGNATURE_TOLERANCE_SECS,
    ) {
        warn!(%err, "webhook signature verification failed");
        return HandlerResponse::text(StatusCode::BAD_REQUEST, format!("Webhook Error: {}", err));
    }

    let event: Event = match serde_json::from_str(request.payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "webhook payload is not a valid event");
            return HandlerResponse::text(StatusCode::BAD_REQUEST, format!("Webhook Error: {}", err));
        }
    };

    match event.kind.as_str() {
        "checkout.session.completed" => {
            let session: CompletedSession = match serde_json::from_value(event.data.object) {
                Ok(session) => session,
                Err(err) => {
                    warn!(event_id = %event.id, %err, "malformed checkout session");
                    return HandlerResponse::text(
                        StatusCode::BAD_REQUEST,
                        format!("Webhook Error: {}", err),
                    );
                }
            };
            if let Err(err) = on_checkout_completed(session, sink, rebuild, now).await {
                error!(event_id = %event.id, %err, "failed to record sale");
                return HandlerResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({ "error": err.to_string() }),
                );
            }
        }
        "checkout.session.expired" => {
            let session_id = event.data.object.get("id").and_then(Value::as_str);
            info!(?session_id, "checkout session expired");
        }
        other => info!(event_type = other, "unhandled event type"),
    }

    HandlerResponse::json(StatusCode::OK, &json!({ "received": true }))
}

async fn on_checkout_completed(
    session: CompletedSession,
    sink: &dyn SoldRecordSink,
    rebuild: Option<&dyn RebuildTrigger>,
    now: DateTime<Utc>,
) -> Result<()> {
    let customer_email = session.customer_details.and_then(|c| c.email);
    let listing_id = session.metadata.get(LISTING_ID_KEY);
    info!(
        session_id = %session.id,
        ?listing_id,
        ?customer_email,
        amount_total = ?session.amount_total,
        "checkout completed"
    );

    let Some(listing_id) = listing_id else {
        return Ok(());
    };
    let Ok(listing_id) = listing_id.trim().parse::<u64>() else {
        warn!(%listing_id, "listing id metadata is not numeric; ignoring");
        return Ok(());
    };

    sink.record_sold(&SoldRecord {
        listing_id,
        sold_at: now,
        session_id: session.id,
        customer_email,
        amount_total: session.amount_total,
    })
    .await?;

    if let Some(rebuild) = rebuild {
        if let Err(err) = rebuild.trigger().await {
            error!(%err, "failed to trigger rebuild");
        }
    }
    Ok(())
}
