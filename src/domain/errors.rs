use thiserror::Error;

/// Errors raised by the valuation pipeline (dataset, model, scenarios).
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("historical dataset unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("insufficient training data: {rows} clean rows, minimum is {min}")]
    InsufficientData { rows: usize, min: usize },

    #[error("model fit failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("feature schema mismatch: model trained on {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

/// Per-instrument feed failures. Always scoped to a single symbol so one
/// broken instrument never aborts collection for the others.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed for {symbol}: {reason}")]
    RequestFailed { symbol: String, reason: String },

    #[error("feed timed out for {symbol} after {timeout_ms}ms")]
    Timeout { symbol: String, timeout_ms: u64 },

    #[error("malformed feed payload for {symbol}: {reason}")]
    MalformedPayload { symbol: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valuation_error_formatting() {
        let err = ValuationError::InsufficientData { rows: 7, min: 24 };
        let msg = err.to_string();
        assert!(msg.contains("7 clean rows"));
        assert!(msg.contains("24"));
    }

    #[test]
    fn test_feed_error_carries_symbol() {
        let err = FeedError::Timeout {
            symbol: "BZ=F".to_string(),
            timeout_ms: 4000,
        };
        assert!(err.to_string().contains("BZ=F"));
        assert!(err.to_string().contains("4000"));
    }
}
