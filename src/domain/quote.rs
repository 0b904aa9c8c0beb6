use serde::{Deserialize, Serialize};

use crate::domain::instrument::QuoteUnit;

/// A normalized market quote for one instrument.
///
/// `value` and `delta` are always in the instrument's reporting unit (see
/// `ConversionTable`), never in the raw exchange unit. Rebuilt on every feed
/// refresh, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub instrument: String,
    pub value: f64,
    pub prior_value: f64,
    pub delta: f64,
    pub unit: QuoteUnit,
    /// False when the feed failed or returned no observations. The zero in
    /// `value` is then a placeholder, and the presentation layer must label
    /// it as unavailable rather than show it as a real price.
    pub available: bool,
}

impl Quote {
    /// Placeholder quote for a failed or empty fetch.
    pub fn unavailable(instrument: &str, unit: QuoteUnit) -> Self {
        Self {
            instrument: instrument.to_string(),
            value: 0.0,
            prior_value: 0.0,
            delta: 0.0,
            unit,
            available: false,
        }
    }
}
