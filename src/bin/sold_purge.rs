use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use record_shop_sync::config;
use record_shop_sync::sold::SoldStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Delete sold records past their retention window")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let store = SoldStore::connect(&cfg.sold_database_url()).await?;
    let removed = store.purge_expired(chrono::Utc::now()).await?;
    info!(removed, "sold record purge complete");
    Ok(())
}
