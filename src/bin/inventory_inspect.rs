use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use record_shop_sync::config;
use record_shop_sync::inventory;
use record_shop_sync::sold::SoldStore;
use record_shop_sync::storefront::{self, format_condition, format_price};

#[derive(Debug, Parser)]
#[command(author, version, about = "Print the available records in the inventory snapshot")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Also hide records the webhook has marked sold
    #[arg(long)]
    hide_sold: bool,
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
    let path = cfg.inventory_path();
    let snapshot = inventory::load(&path)
        .await
        .ok_or_else(|| anyhow!("no readable inventory at {}", path.display()))?;

    let sold = if args.hide_sold {
        let store = SoldStore::connect(&cfg.sold_database_url()).await?;
        store.active_listing_ids(chrono::Utc::now()).await?
    } else {
        Vec::new()
    };

    println!(
        "seller: {}  last sync: {}",
        snapshot.seller,
        snapshot.last_sync.to_rfc3339()
    );
    for record in storefront::available(&snapshot)
        .into_iter()
        .filter(|r| !sold.contains(&r.item.discogs_listing_id))
    {
        let item = record.item;
        println!(
            "{:<60} {:>10}  {}/{}  {}",
            record.slug,
            format_price(item.price, &item.currency),
            format_condition(&item.condition),
            format_condition(&item.sleeve_condition),
            item.stripe_price_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
