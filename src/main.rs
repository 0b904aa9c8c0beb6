use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use etanolsim::application::state::AppState;
use etanolsim::config::Config;
use etanolsim::infrastructure::feed::MarketFeedClient;
use etanolsim::infrastructure::yahoo::YahooQuoteFeed;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Starting with dataset {}", config.dataset_path.display());

    let feed = YahooQuoteFeed::new(config.feed_base_url.clone(), config.feed_lookback_days);
    let client = MarketFeedClient::new(
        Arc::new(feed),
        config.conversion_table(),
        config.feed_timeout_ms,
    );

    let state = AppState::new(client);
    if !state.reload_dataset(&config.dataset_path) {
        warn!("No historical dataset available, snapshot will be degraded");
    }

    // One default interaction: scenario seeded from the latest row. The
    // presentation layer consumes this same snapshot as plain data.
    let snapshot = state.snapshot(None).await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
