//! Checkout-session endpoint logic: validates the storefront's request and
//! asks the payment provider for a hosted payment page.
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use crate::config;
use crate::response::HandlerResponse;
use crate::stripe::{CheckoutSessions, NewCheckoutSession, ShippingRate, LISTING_ID_KEY};

const CORS_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Content-Type", "application/json"),
];

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    #[serde(default)]
    price_id: Option<String>,
    /// The storefront may send the id as a string or a number.
    #[serde(default)]
    discogs_listing_id: Option<Value>,
}

fn listing_id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn session_for(
    price_id: &str,
    listing_id: &str,
    origin: &str,
    settings: &config::Checkout,
) -> NewCheckoutSession {
    let origin = origin.trim_end_matches('/');
    let mut metadata = BTreeMap::new();
    metadata.insert(LISTING_ID_KEY.to_string(), listing_id.to_string());
    NewCheckoutSession {
        price_id: price_id.to_string(),
        quantity: 1,
        allowed_countries: settings.allowed_countries.clone(),
        shipping: ShippingRate {
            amount: settings.shipping_amount,
            currency: settings.shipping_currency.clone(),
            display_name: settings.shipping_display_name.clone(),
            min_business_days: settings.delivery_min_days,
            max_business_days: settings.delivery_max_days,
        },
        success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", origin),
        cancel_url: format!("{}/records", origin),
        metadata,
    }
}

fn respond(status: StatusCode, body: Value) -> HandlerResponse {
    HandlerResponse::json(status, &body).with_headers(CORS_HEADERS)
}

/// `origin` is the scheme+host the storefront was served from; redirect
/// URLs are built from it.
#[instrument(skip_all, fields(%method))]
pub async fn handle_checkout(
    method: &Method,
    origin: &str,
    body: &str,
    sessions: &dyn CheckoutSessions,
    settings: &config::Checkout,
) -> HandlerResponse {
    if method == Method::OPTIONS {
        return HandlerResponse {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: String::new(),
        }
        .with_headers(CORS_HEADERS);
    }
    if method != Method::POST {
        return respond(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "Method not allowed" }),
        );
    }

    let request: CheckoutRequest = serde_json::from_str(body).unwrap_or_default();
    let price_id = request
        .price_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let listing_id = listing_id_string(request.discogs_listing_id.as_ref());
    let (Some(price_id), Some(listing_id)) = (price_id, listing_id) else {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing priceId or discogsListingId" }),
        );
    };

    let session = session_for(price_id, &listing_id, origin, settings);
    match sessions.create_checkout_session(&session).await {
        Ok(created) => {
            info!(session_id = %created.id, %listing_id, "checkout session created");
            respond(StatusCode::OK, json!({ "url": created.url }))
        }
        Err(err) => {
            error!(%err, %listing_id, "checkout error");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            )
        }
    }
}
