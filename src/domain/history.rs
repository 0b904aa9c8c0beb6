use chrono::{Datelike, NaiveDate};

use crate::domain::features::FeatureVector;

/// One clean row of the historical dataset: drivers plus the observed
/// ethanol price for a trading date. The seasonal `month` column is derived
/// from the date at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub oil: f64,
    pub fx: f64,
    pub sugar: f64,
    pub ethanol: f64,
    pub month: u32,
}

impl HistoricalRecord {
    pub fn new(date: NaiveDate, oil: f64, fx: f64, sugar: f64, ethanol: f64) -> Self {
        Self {
            date,
            oil,
            fx,
            sugar,
            ethanol,
            month: date.month(),
        }
    }

    /// The model input for this row. Routed through the shared builder so
    /// training rows and scenario rows can never diverge in field order.
    pub fn features(&self) -> FeatureVector {
        FeatureVector::build(self.oil, self.fx, self.sugar, self.month)
    }
}
