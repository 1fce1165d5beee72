//! Outbound HTTP with bounded transport retries and rate-limit waits.
//!
//! A `429 Too Many Requests` response waits for the server-supplied
//! `Retry-After` delay and re-sends without consuming an attempt. Transport
//! failures consume one attempt each and back off for a fixed delay. Every
//! other response, including 4xx/5xx, goes straight back to the caller.
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Request, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transport_backoff: Duration,
    pub default_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&config::Retry::default())
    }
}

impl From<&config::Retry> for RetryPolicy {
    fn from(cfg: &config::Retry) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            transport_backoff: Duration::from_millis(cfg.transport_backoff_ms),
            default_rate_limit_wait: Duration::from_secs(cfg.default_rate_limit_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    http: Client,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self::with_client(http, policy))
    }

    pub fn with_client(http: Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Underlying client, for building requests.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying as described in the module docs. Fails with
    /// [`SyncError::Network`] once `max_attempts` transport failures occurred.
    #[instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let mut failures = 0u32;
        loop {
            let attempt = request.try_clone().ok_or_else(|| {
                SyncError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "request body cannot be replayed",
                ))
            })?;

            match self.http.execute(attempt).await {
                Ok(res) if res.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry_after(res.headers(), Utc::now())
                        .unwrap_or(self.policy.default_rate_limit_wait);
                    warn!(wait_secs = wait.as_secs_f64(), "rate limited; waiting");
                    sleep(wait).await;
                }
                Ok(res) => {
                    debug!(status = %res.status(), "response received");
                    return Ok(res);
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.policy.max_attempts {
                        warn!(?err, failures, "request failed; giving up");
                        return Err(SyncError::Network(err));
                    }
                    warn!(
                        ?err,
                        failures,
                        max_attempts = self.policy.max_attempts,
                        "request failed, retrying"
                    );
                    sleep(self.policy.transport_backoff).await;
                }
            }
        }
    }
}

/// Parse a `Retry-After` header given either as delta-seconds or as an HTTP date.
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
