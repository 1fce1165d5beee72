use std::sync::Arc;

use async_trait::async_trait;
use record_shop_sync::checkout::handle_checkout;
use record_shop_sync::config::Checkout;
use record_shop_sync::stripe::{CheckoutSession, CheckoutSessions, NewCheckoutSession};
use record_shop_sync::{Result, SyncError};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct RecordingSessions {
    sessions: Arc<Mutex<Vec<NewCheckoutSession>>>,
    fail: bool,
}

#[async_trait]
impl CheckoutSessions for RecordingSessions {
    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession> {
        self.sessions.lock().await.push(session.clone());
        if self.fail {
            return Err(SyncError::Upstream {
                status: StatusCode::BAD_REQUEST,
                body: "No such price".into(),
            });
        }
        Ok(CheckoutSession {
            id: "cs_test_1".into(),
            url: Some("https://checkout.test/pay/cs_test_1".into()),
        })
    }
}

const ORIGIN: &str = "https://shop.test";

#[tokio::test]
async fn preflight_returns_cors_headers() {
    let sessions = RecordingSessions::default();
    let res = handle_checkout(&Method::OPTIONS, ORIGIN, "", &sessions, &Checkout::default()).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());
    assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    assert_eq!(
        res.header("Access-Control-Allow-Methods"),
        Some("POST, OPTIONS")
    );
    assert!(sessions.sessions.lock().await.is_empty());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let sessions = RecordingSessions::default();
    let res = handle_checkout(&Method::GET, ORIGIN, "", &sessions, &Checkout::default()).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("Access-Control-Allow-Origin"), Some("*"));
}

#[tokio::test]
async fn missing_fields_are_bad_requests() {
    let sessions = RecordingSessions::default();
    for body in [
        "",
        "not json",
        r#"{"priceId":"price_1"}"#,
        r#"{"discogsListingId":"42"}"#,
        r#"{"priceId":"","discogsListingId":42}"#,
    ] {
        let res =
            handle_checkout(&Method::POST, ORIGIN, body, &sessions, &Checkout::default()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(
            res.json_body(),
            json!({ "error": "Missing priceId or discogsListingId" })
        );
    }
    assert!(sessions.sessions.lock().await.is_empty());
}

#[tokio::test]
async fn creates_session_and_returns_url() {
    let sessions = RecordingSessions::default();
    let body = json!({ "priceId": "price_1", "discogsListingId": 42 }).to_string();

    let res = handle_checkout(&Method::POST, ORIGIN, &body, &sessions, &Checkout::default()).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json_body(),
        json!({ "url": "https://checkout.test/pay/cs_test_1" })
    );
    assert_eq!(res.header("Content-Type"), Some("application/json"));

    let created = sessions.sessions.lock().await.clone();
    assert_eq!(created.len(), 1);
    let session = &created[0];
    assert_eq!(session.price_id, "price_1");
    assert_eq!(session.quantity, 1);
    assert_eq!(session.metadata.get("discogs_listing_id").unwrap(), "42");
    assert_eq!(session.cancel_url, "https://shop.test/records");
    assert_eq!(session.shipping.display_name, "Standard Shipping");
}

#[tokio::test]
async fn provider_failure_is_a_server_error() {
    let sessions = RecordingSessions {
        fail: true,
        ..Default::default()
    };
    let body = json!({ "priceId": "price_1", "discogsListingId": "42" }).to_string();

    let res = handle_checkout(&Method::POST, ORIGIN, &body, &sessions, &Checkout::default()).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = res.json_body()["error"].as_str().unwrap().to_string();
    assert!(error.contains("No such price"));
}
