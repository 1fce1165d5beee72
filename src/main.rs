use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use record_shop_sync::config::{self, Secrets};
use record_shop_sync::discogs::DiscogsClient;
use record_shop_sync::http::{RateLimitedClient, RetryPolicy};
use record_shop_sync::pipeline::{self, SyncSettings};
use record_shop_sync::stripe::{PaymentCatalog, StripeClient};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Mirror the seller's marketplace inventory into the storefront snapshot"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Do not touch the payment catalog even if STRIPE_SECRET_KEY is set
    #[arg(long)]
    skip_payments: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let secrets = Secrets::from_env();
    let token = secrets.require_discogs_token()?;
    cfg.ensure_dirs()?;

    info!(time = %chrono::Utc::now().to_rfc3339(), "=== inventory sync ===");

    let http = RateLimitedClient::new(RetryPolicy::from(&cfg.retry))?;
    let discogs = DiscogsClient::from_config(&cfg, http.clone(), token)?;

    let stripe = match (&secrets.stripe_secret_key, args.skip_payments) {
        (Some(key), false) => Some(StripeClient::from_config(&cfg, http, key)?),
        (Some(_), true) => {
            info!("--skip-payments set; payment catalog will not be touched");
            None
        }
        (None, _) => {
            warn!("STRIPE_SECRET_KEY not set; skipping payment catalog sync");
            None
        }
    };

    let settings = SyncSettings::from_config(&cfg);
    let summary = pipeline::run_sync(
        &discogs,
        stripe.as_ref().map(|s| s as &dyn PaymentCatalog),
        &settings,
    )
    .await
    .context("sync failed")?;

    match summary.inventory {
        Some(inventory) => info!(
            listings = summary.listings,
            enriched = summary.enriched,
            saved = inventory.items.len(),
            path = %settings.inventory_path.display(),
            "=== sync complete ==="
        ),
        None => info!("=== nothing to sync ==="),
    }
    Ok(())
}
