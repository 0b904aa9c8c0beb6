use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::trace;

use crate::domain::errors::FeedError;
use crate::domain::ports::{Observation, QuoteFeed};

// ===== Chart endpoint response =====

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    close: Vec<Option<f64>>,
}

// ===== Feed implementation =====

/// Live quote source speaking the Yahoo-Finance chart JSON dialect.
pub struct YahooQuoteFeed {
    client: Client,
    base_url: String,
    lookback_days: u32,
}

impl YahooQuoteFeed {
    pub fn new(base_url: String, lookback_days: u32) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            lookback_days,
        }
    }
}

#[async_trait]
impl QuoteFeed for YahooQuoteFeed {
    async fn recent_closes(&self, symbol: &str) -> Result<Vec<Observation>, FeedError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}d&interval=1d",
            self.base_url, symbol, self.lookback_days
        );
        trace!("Feed: GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::RequestFailed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FeedError::RequestFailed {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let payload: ChartResponse =
            response
                .json()
                .await
                .map_err(|e| FeedError::MalformedPayload {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                })?;

        let result = payload
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| FeedError::MalformedPayload {
                symbol: symbol.to_string(),
                reason: "empty chart result".to_string(),
            })?;

        let timestamps = result.timestamp.unwrap_or_default();
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        // Feeds pad trading holidays with null closes; skip them
        let mut observations: Vec<Observation> = timestamps
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let close = close?;
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(Observation { date, close })
            })
            .collect();
        observations.sort_by_key(|o| o.date);

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_payload_parses() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1709251200, 1709337600, 1709424000],
                    "indicators": {
                        "quote": [{"close": [81.2, null, 82.7]}]
                    }
                }]
            }
        }"#;
        let payload: ChartResponse = serde_json::from_str(body).unwrap();
        let result = &payload.chart.result.as_ref().unwrap()[0];
        assert_eq!(result.timestamp.as_ref().unwrap().len(), 3);
        assert_eq!(result.indicators.quote[0].close[1], None);
    }
}
