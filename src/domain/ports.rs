use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::errors::FeedError;

/// A daily closing observation returned by a quote feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub close: f64,
}

// Need async_trait for async functions in traits
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Fetches a short recent daily close history for one feed symbol,
    /// oldest first. Fails per symbol; the caller decides the fallback.
    async fn recent_closes(&self, symbol: &str) -> Result<Vec<Observation>, FeedError>;
}
