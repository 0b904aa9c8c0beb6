use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::dataset::HistoricalDataset;
use crate::application::model_cache::ModelCache;
use crate::application::scenario::{
    self, Driver, DriverValues, ParityStatus, OIL_SWEEP_POINTS, OIL_SWEEP_RANGE,
};
use crate::domain::quote::Quote;
use crate::infrastructure::feed::MarketFeedClient;

/// Cheap/expensive call for the observed market price against fair value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketSignal {
    /// Market trades above the model's fair value.
    Expensive,
    /// Market trades at or below fair value.
    Cheap,
}

/// Read-only result of one valuation interaction. The presentation layer
/// renders this and never mutates it; absent values mean "unavailable",
/// never a fabricated zero.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationSnapshot {
    pub trained: bool,
    pub fit_score: Option<f64>,
    pub dataset_version: Option<String>,
    pub quotes: HashMap<String, Quote>,
    pub scenario: Option<DriverValues>,
    pub point_estimate: Option<f64>,
    /// Last observed ethanol price from the historical dataset.
    pub market_price: Option<f64>,
    /// Fair value minus market price.
    pub vs_market: Option<f64>,
    pub signal: Option<MarketSignal>,
    pub sensitivity_curve: Vec<(f64, f64)>,
    pub parity_ratio: Option<f64>,
    pub parity_status: Option<ParityStatus>,
}

impl ValuationSnapshot {
    fn degraded(quotes: HashMap<String, Quote>) -> Self {
        Self {
            trained: false,
            fit_score: None,
            dataset_version: None,
            quotes,
            scenario: None,
            point_estimate: None,
            market_price: None,
            vs_market: None,
            signal: None,
            sensitivity_curve: Vec::new(),
            parity_ratio: None,
            parity_status: None,
        }
    }
}

/// Owns the pipeline's long-lived pieces: the dataset slot, the model
/// cache, and the feed client. The hosting environment calls `snapshot`
/// once per user interaction, possibly concurrently; all shared state is
/// behind atomic slot replacement, so readers never see partial updates.
pub struct AppState {
    dataset: RwLock<Option<Arc<HistoricalDataset>>>,
    cache: ModelCache,
    feed: MarketFeedClient,
}

impl AppState {
    pub fn new(feed: MarketFeedClient) -> Self {
        Self {
            dataset: RwLock::new(None),
            cache: ModelCache::new(),
            feed,
        }
    }

    /// Loads (or reloads) the dataset, replacing the slot atomically. A
    /// load failure keeps the previous dataset, if any: stale beats absent.
    pub fn reload_dataset(&self, path: &Path) -> bool {
        match HistoricalDataset::load(path) {
            Ok(dataset) => {
                let mut slot = match self.dataset.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *slot = Some(Arc::new(dataset));
                true
            }
            Err(e) => {
                warn!("AppState: dataset reload failed, keeping current: {}", e);
                false
            }
        }
    }

    pub fn dataset(&self) -> Option<Arc<HistoricalDataset>> {
        let slot = match self.dataset.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }

    /// Produces the full valuation snapshot for one interaction.
    ///
    /// `user_scenario = None` seeds the scenario from the latest historical
    /// row, mirroring "today's market" as the default view. Every failure
    /// downstream of the quotes degrades the snapshot instead of aborting
    /// it.
    pub async fn snapshot(&self, user_scenario: Option<DriverValues>) -> ValuationSnapshot {
        let quotes = self.feed.collect_quotes().await;

        let Some(dataset) = self.dataset() else {
            info!("Snapshot: no dataset loaded, rendering degraded state");
            return ValuationSnapshot::degraded(quotes);
        };

        let model = match self.cache.get_or_train(&dataset) {
            Ok(model) => model,
            Err(e) => {
                warn!("Snapshot: model unavailable: {}", e);
                return ValuationSnapshot::degraded(quotes);
            }
        };

        let latest = dataset.latest();
        let scenario_values = user_scenario.or_else(|| {
            latest.map(|rec| DriverValues {
                oil: rec.oil,
                fx: rec.fx,
                sugar: rec.sugar,
                month: rec.month,
            })
        });

        let point_estimate = match scenario_values {
            Some(ref values) => match scenario::point_estimate(&model, values) {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("Snapshot: point estimate failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let market_price = latest.map(|rec| rec.ethanol);
        let vs_market = match (point_estimate, market_price) {
            (Some(fair), Some(market)) => Some(fair - market),
            _ => None,
        };
        let signal = vs_market.map(|diff| {
            if diff < 0.0 {
                MarketSignal::Expensive
            } else {
                MarketSignal::Cheap
            }
        });

        let sensitivity_curve = match scenario_values {
            Some(values) => {
                match scenario::sweep(
                    model.clone(),
                    values,
                    Driver::Oil,
                    OIL_SWEEP_RANGE,
                    OIL_SWEEP_POINTS,
                ) {
                    Ok(points) => match points.collect::<Result<Vec<_>, _>>() {
                        Ok(curve) => curve,
                        Err(e) => {
                            warn!("Snapshot: sweep aborted: {}", e);
                            Vec::new()
                        }
                    },
                    Err(e) => {
                        warn!("Snapshot: sweep rejected: {}", e);
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        // Ethanol fair value vs gasoline at the pump, both in BRL/litre.
        // The gasoline quote arrives in USD/litre and is brought into BRL
        // with the scenario's exchange rate.
        let parity_ratio = match (point_estimate, quotes.get("gasoline"), scenario_values) {
            (Some(fair), Some(gasoline), Some(values)) if gasoline.available => {
                match scenario::parity_ratio(fair, gasoline.value * values.fx) {
                    Ok(ratio) => Some(ratio),
                    Err(e) => {
                        warn!("Snapshot: parity ratio unavailable: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };
        let parity_status = parity_ratio.map(ParityStatus::classify);

        ValuationSnapshot {
            trained: true,
            fit_score: Some(model.fit_score()),
            dataset_version: Some(dataset.version().as_str().to_string()),
            quotes,
            scenario: scenario_values,
            point_estimate,
            market_price,
            vs_market,
            signal,
            sensitivity_curve,
            parity_ratio,
            parity_status,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dataset", &"<RwLock>")
            .field("cache", &self.cache)
            .finish()
    }
}
