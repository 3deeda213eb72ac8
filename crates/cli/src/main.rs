//! PlexMCP Plan Catalog CLI
//!
//! Lists the active product plans from Stripe once and prints them as JSON.
//! Ctrl-C cancels the listing.
//!
//! Environment:
//! - `STRIPE_SECRET_KEY` (required)
//! - `STRIPE_API_BASE`, `STRIPE_TIMEOUT_SECS`, `CATALOG_BRAND_NAME` (optional)
//! - `CATALOG_DEADLINE_SECS` (optional, default 60)

use std::time::Duration;

use plexmcp_plan_catalog::{RequestContext, StripePlanCatalog};
use tracing::{info, warn};

const DEFAULT_DEADLINE_SECS: u64 = 60;

fn deadline_from_env() -> anyhow::Result<Duration> {
    match std::env::var("CATALOG_DEADLINE_SECS") {
        Ok(raw) => Ok(Duration::from_secs(raw.parse()?)),
        Err(_) => Ok(Duration::from_secs(DEFAULT_DEADLINE_SECS)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let catalog = StripePlanCatalog::from_env()?;
    let deadline = deadline_from_env()?;
    info!(
        deadline_secs = deadline.as_secs(),
        test_mode = catalog.source().config().is_test_mode(),
        "Listing product plans"
    );

    let (ctx, cancel) = RequestContext::with_cancel();
    let ctx = ctx.deadline_at(tokio::time::Instant::now() + deadline);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling plan listing");
            cancel.cancel();
        }
    });

    let plans = catalog.list_active_plans(&ctx).await?;
    println!("{}", serde_json::to_string_pretty(&plans)?);

    Ok(())
}
