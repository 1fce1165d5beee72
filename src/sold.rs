//! Sold-record store written by the checkout webhook.
//!
//! Records are keyed by marketplace listing id and expire after a retention
//! window (one year by default). Expired rows are invisible to reads and
//! removed by [`SoldStore::purge_expired`].
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::SoldRecord;

pub const SOLD_RETENTION_DAYS: i64 = 365;

#[async_trait]
pub trait SoldRecordSink: Send + Sync {
    async fn record_sold(&self, record: &SoldRecord) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SoldStore {
    pool: SqlitePool,
    retention: Duration,
}

impl SoldStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            retention: Duration::days(SOLD_RETENTION_DAYS),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Open (creating if needed) and migrate the store at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.starts_with("sqlite::memory");
        // Every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect(database_url)
            .await?;
        if !in_memory {
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&pool)
                .await?;
        }
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    #[instrument(skip_all, fields(listing_id = record.listing_id))]
    pub async fn upsert(&self, record: &SoldRecord) -> Result<()> {
        let expires_at = (record.sold_at + self.retention).timestamp();
        sqlx::query(
            "INSERT INTO sold_items (listing_id, sold_at, session_id, customer_email, amount_total, expires_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(listing_id) DO UPDATE SET
                sold_at = excluded.sold_at,
                session_id = excluded.session_id,
                customer_email = excluded.customer_email,
                amount_total = excluded.amount_total,
                expires_at = excluded.expires_at",
        )
        .bind(record.listing_id as i64)
        .bind(record.sold_at)
        .bind(&record.session_id)
        .bind(record.customer_email.as_deref())
        .bind(record.amount_total)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unexpired record for `listing_id`.
    pub async fn get(&self, listing_id: u64, now: DateTime<Utc>) -> Result<Option<SoldRecord>> {
        let row = sqlx::query(
            "SELECT listing_id, sold_at, session_id, customer_email, amount_total
             FROM sold_items WHERE listing_id = ? AND expires_at > ?",
        )
        .bind(listing_id as i64)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SoldRecord {
            listing_id: row.get::<i64, _>("listing_id") as u64,
            sold_at: row.get("sold_at"),
            session_id: row.get("session_id"),
            customer_email: row.get("customer_email"),
            amount_total: row.get("amount_total"),
        }))
    }

    /// Listing ids of all unexpired records, ascending.
    pub async fn active_listing_ids(&self, now: DateTime<Utc>) -> Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT listing_id FROM sold_items WHERE expires_at > ? ORDER BY listing_id",
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(|id| id as u64).collect())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let res = sqlx::query("DELETE FROM sold_items WHERE expires_at <= ?")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;
        info!(removed = res.rows_affected(), "purged expired sold records");
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl SoldRecordSink for SoldStore {
    async fn record_sold(&self, record: &SoldRecord) -> Result<()> {
        self.upsert(record).await
    }
}
