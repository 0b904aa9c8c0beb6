use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::errors::FeedError;
use crate::domain::ports::{Observation, QuoteFeed};

enum Scripted {
    Closes(Vec<Observation>),
    Fail,
    Hang,
}

/// Scripted feed for tests: each symbol either returns a fixed close
/// history, fails, or hangs (to exercise the client timeout). Unknown
/// symbols fail, like a feed rejecting an unlisted identifier.
#[derive(Default)]
pub struct MockQuoteFeed {
    scripts: HashMap<String, Scripted>,
}

impl MockQuoteFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(mut self, symbol: &str, closes: Vec<Observation>) -> Self {
        self.scripts
            .insert(symbol.to_string(), Scripted::Closes(closes));
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.scripts.insert(symbol.to_string(), Scripted::Fail);
        self
    }

    pub fn with_hang(mut self, symbol: &str) -> Self {
        self.scripts.insert(symbol.to_string(), Scripted::Hang);
        self
    }
}

#[async_trait]
impl QuoteFeed for MockQuoteFeed {
    async fn recent_closes(&self, symbol: &str) -> Result<Vec<Observation>, FeedError> {
        match self.scripts.get(symbol) {
            Some(Scripted::Closes(closes)) => Ok(closes.clone()),
            Some(Scripted::Hang) => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                unreachable!("hung fetch should be cut off by the client timeout")
            }
            Some(Scripted::Fail) | None => Err(FeedError::RequestFailed {
                symbol: symbol.to_string(),
                reason: "scripted failure".to_string(),
            }),
        }
    }
}
