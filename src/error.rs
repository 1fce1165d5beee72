//! Error taxonomy for a sync run and its collaborators.
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream error {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("release {release_id} enrichment failed: {reason}")]
    Enrichment { release_id: u64, reason: String },
    #[error("listing {listing_id} reconciliation failed: {reason}")]
    Reconciliation { listing_id: u64, reason: String },
    #[error("signature verification failed: {0}")]
    Signature(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl SyncError {
    /// Whether the error aborts a whole sync run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SyncError::Enrichment { .. } | SyncError::Reconciliation { .. } | SyncError::Signature(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
