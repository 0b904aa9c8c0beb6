use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::errors::FeedError;
use crate::domain::instrument::{ConversionTable, InstrumentSpec, INSTRUMENTS};
use crate::domain::ports::{Observation, QuoteFeed};
use crate::domain::quote::Quote;

/// Collects one normalized [`Quote`] per registered instrument.
///
/// Failure policy: each instrument resolves to a quote no matter what. A
/// fetch error, timeout, or empty history yields an `available = false`
/// zero quote and never aborts the other instruments. Fetches are issued
/// concurrently, so the aggregate wall time is bounded by a single
/// per-instrument timeout.
pub struct MarketFeedClient {
    feed: Arc<dyn QuoteFeed>,
    converter: ConversionTable,
    per_fetch_timeout: Duration,
}

impl MarketFeedClient {
    pub fn new(feed: Arc<dyn QuoteFeed>, converter: ConversionTable, timeout_ms: u64) -> Self {
        Self {
            feed,
            converter,
            per_fetch_timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Refreshes every registered instrument. Ordering of the result map is
    /// irrelevant; consumers look quotes up by instrument name.
    pub async fn collect_quotes(&self) -> HashMap<String, Quote> {
        let fetches = INSTRUMENTS.iter().map(|spec| self.fetch_one(spec));
        future::join_all(fetches)
            .await
            .into_iter()
            .map(|quote| (quote.instrument.clone(), quote))
            .collect()
    }

    async fn fetch_one(&self, spec: &InstrumentSpec) -> Quote {
        let result = match timeout(self.per_fetch_timeout, self.feed.recent_closes(spec.symbol))
            .await
        {
            Ok(inner) => inner,
            Err(_) => Err(FeedError::Timeout {
                symbol: spec.symbol.to_string(),
                timeout_ms: self.per_fetch_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(observations) => self.quote_from_observations(spec, &observations),
            Err(e) => {
                warn!("Feed: {} unavailable: {}", spec.name, e);
                Quote::unavailable(spec.name, spec.unit)
            }
        }
    }

    /// Builds the quote from a recent close history, normalizing units.
    /// With fewer than two observations there is no delta to compute; with
    /// none at all the quote is a labeled zero placeholder.
    fn quote_from_observations(&self, spec: &InstrumentSpec, observations: &[Observation]) -> Quote {
        match observations {
            [] => {
                warn!("Feed: {} returned no observations", spec.name);
                Quote::unavailable(spec.name, spec.unit)
            }
            [only] => {
                debug!("Feed: {} has a single observation, delta = 0", spec.name);
                let value = self.converter.convert(spec.name, only.close);
                Quote {
                    instrument: spec.name.to_string(),
                    value,
                    prior_value: value,
                    delta: 0.0,
                    unit: spec.unit,
                    available: true,
                }
            }
            [.., prev, last] => {
                let value = self.converter.convert(spec.name, last.close);
                let prior_value = self.converter.convert(spec.name, prev.close);
                Quote {
                    instrument: spec.name.to_string(),
                    value,
                    prior_value,
                    delta: value - prior_value,
                    unit: spec.unit,
                    available: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::QuoteUnit;
    use crate::infrastructure::mock::MockQuoteFeed;
    use chrono::NaiveDate;

    fn obs(day: u32, close: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close,
        }
    }

    fn client(mock: MockQuoteFeed) -> MarketFeedClient {
        MarketFeedClient::new(Arc::new(mock), ConversionTable::default(), 200)
    }

    #[tokio::test]
    async fn test_delta_from_last_two_closes() {
        let mock = MockQuoteFeed::new()
            .with_closes("BRL=X", vec![obs(1, 4.80), obs(2, 4.90), obs(3, 5.00)]);
        let quotes = client(mock).collect_quotes().await;

        let fx = &quotes["fx_rate"];
        assert!(fx.available);
        assert!((fx.value - 5.00).abs() < 1e-9);
        assert!((fx.prior_value - 4.90).abs() < 1e-9);
        assert!((fx.delta - 0.10).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_values_are_unit_converted() {
        // 80 USD/bbl -> ~0.503 USD/L
        let mock = MockQuoteFeed::new().with_closes("BZ=F", vec![obs(1, 79.0), obs(2, 80.0)]);
        let quotes = client(mock).collect_quotes().await;

        let oil = &quotes["brent_oil"];
        assert!((oil.value - 80.0 / 158.987).abs() < 1e-6);
        assert!((oil.delta - 1.0 / 158.987).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_gasoline_quote_is_usd_per_litre() {
        // RBOB trades in USD/gallon; the normalized quote is USD/litre and
        // must be tagged as such. Converting to BRL is the consumer's job
        // (it needs an exchange rate, which is not the feed's concern).
        let mock = MockQuoteFeed::new().with_closes("RB=F", vec![obs(1, 2.50), obs(2, 2.60)]);
        let quotes = client(mock).collect_quotes().await;

        let gasoline = &quotes["gasoline"];
        assert_eq!(gasoline.unit, QuoteUnit::UsdPerLitre);
        assert!((gasoline.value - 2.60 / 3.78541).abs() < 1e-6);
        assert!((gasoline.delta - 0.10 / 3.78541).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_single_observation_has_zero_delta() {
        let mock = MockQuoteFeed::new().with_closes("SB=F", vec![obs(1, 22.0)]);
        let quotes = client(mock).collect_quotes().await;

        let sugar = &quotes["sugar"];
        assert!(sugar.available);
        assert_eq!(sugar.delta, 0.0);
        assert!((sugar.value - 22.0 * 0.0220462).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_empty_history_is_unavailable() {
        let mock = MockQuoteFeed::new().with_closes("SB=F", vec![]);
        let quotes = client(mock).collect_quotes().await;

        let sugar = &quotes["sugar"];
        assert!(!sugar.available);
        assert_eq!(sugar.value, 0.0);
        assert_eq!(sugar.delta, 0.0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_poison_the_rest() {
        let mock = MockQuoteFeed::new()
            .with_failure("BZ=F")
            .with_closes("BRL=X", vec![obs(1, 4.90), obs(2, 4.95)]);
        let quotes = client(mock).collect_quotes().await;

        assert_eq!(quotes.len(), INSTRUMENTS.len());
        assert!(!quotes["brent_oil"].available);
        assert!(quotes["fx_rate"].available);
    }

    #[tokio::test]
    async fn test_hanging_instrument_times_out() {
        let mock = MockQuoteFeed::new()
            .with_hang("BZ=F")
            .with_closes("BRL=X", vec![obs(1, 4.90), obs(2, 4.95)]);

        let start = std::time::Instant::now();
        let quotes = client(mock).collect_quotes().await;

        // Bounded by one timeout, not one per instrument
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert!(!quotes["brent_oil"].available);
        assert!(quotes["fx_rate"].available);
    }
}
