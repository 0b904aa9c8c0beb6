use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::errors::ValuationError;
use crate::domain::history::HistoricalRecord;

/// Expected date format of the dataset's index column.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity of one loaded dataset: SHA-256 over the raw file bytes.
/// Two loads of identical content share a version, so the model cache can
/// skip retraining; any edit to the file produces a new version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetVersion(String);

impl DatasetVersion {
    fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for logs
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    oil_price: Option<f64>,
    fx_rate: Option<f64>,
    sugar_price: Option<f64>,
    ethanol_price: Option<f64>,
}

/// The cleaned, date-sorted historical dataset. Immutable after load.
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    records: Vec<HistoricalRecord>,
    version: DatasetVersion,
}

impl HistoricalDataset {
    /// Loads the consolidated CSV from disk. A missing or unreadable file is
    /// `DataUnavailable`; the caller renders a degraded, model-less state.
    pub fn load(path: &Path) -> Result<Self, ValuationError> {
        let bytes = std::fs::read(path).map_err(|e| ValuationError::DataUnavailable {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let dataset = Self::from_bytes(&bytes)?;
        info!(
            "Dataset: loaded {} clean rows from {} (version {})",
            dataset.records.len(),
            path.display(),
            dataset.version
        );
        Ok(dataset)
    }

    /// Parses dataset content. Rows with a missing or non-finite field are
    /// dropped before they can reach the feature builder; a malformed header
    /// or unreadable record fails the whole load.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValuationError> {
        let version = DatasetVersion::from_bytes(bytes);
        let mut reader = csv::Reader::from_reader(bytes);

        let mut records: Vec<HistoricalRecord> = Vec::new();
        let mut dropped = 0usize;

        for result in reader.deserialize() {
            let raw: RawRow = result.map_err(|e| ValuationError::DataUnavailable {
                reason: format!("malformed dataset row: {}", e),
            })?;

            let date = match NaiveDate::parse_from_str(&raw.date, DATE_FORMAT) {
                Ok(d) => d,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };

            match (raw.oil_price, raw.fx_rate, raw.sugar_price, raw.ethanol_price) {
                (Some(oil), Some(fx), Some(sugar), Some(ethanol))
                    if oil.is_finite()
                        && fx.is_finite()
                        && sugar.is_finite()
                        && ethanol.is_finite() =>
                {
                    records.push(HistoricalRecord::new(date, oil, fx, sugar, ethanol));
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Dataset: dropped {} rows with missing fields", dropped);
        }

        // Strict time order, one record per date. Stable sort keeps file
        // order among duplicates, so keeping the last occurrence wins.
        records.sort_by_key(|r| r.date);
        let before = records.len();
        dedup_keep_last(&mut records);
        if records.len() < before {
            warn!(
                "Dataset: removed {} duplicate dates (kept latest occurrence)",
                before - records.len()
            );
        }

        Ok(Self { records, version })
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    /// The newest row, used to seed default scenarios.
    pub fn latest(&self) -> Option<&HistoricalRecord> {
        self.records.last()
    }

    pub fn version(&self) -> &DatasetVersion {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn dedup_keep_last(records: &mut Vec<HistoricalRecord>) {
    let mut i = 0;
    while i + 1 < records.len() {
        if records[i].date == records[i + 1].date {
            records.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
date,oil_price,fx_rate,sugar_price,ethanol_price
2024-01-03,78.2,4.92,21.4,2.55
2024-01-02,77.5,4.90,21.1,2.52
2024-01-04,79.0,,21.8,2.58
2024-01-05,80.1,4.95,22.0,2.61
";

    #[test]
    fn test_sorts_and_drops_incomplete_rows() {
        let ds = HistoricalDataset::from_bytes(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3); // 2024-01-04 dropped (missing fx)
        assert_eq!(ds.records()[0].date.to_string(), "2024-01-02");
        assert_eq!(ds.latest().unwrap().date.to_string(), "2024-01-05");
    }

    #[test]
    fn test_month_column_is_derived() {
        let ds = HistoricalDataset::from_bytes(CSV.as_bytes()).unwrap();
        assert!(ds.records().iter().all(|r| r.month == 1));
    }

    #[test]
    fn test_duplicate_dates_keep_latest_occurrence() {
        let csv = "\
date,oil_price,fx_rate,sugar_price,ethanol_price
2024-01-02,77.5,4.90,21.1,2.52
2024-01-02,90.0,5.00,25.0,3.00
";
        let ds = HistoricalDataset::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].oil, 90.0);
    }

    #[test]
    fn test_version_tracks_content() {
        let a = HistoricalDataset::from_bytes(CSV.as_bytes()).unwrap();
        let b = HistoricalDataset::from_bytes(CSV.as_bytes()).unwrap();
        let c = HistoricalDataset::from_bytes(CSV.replace("78.2", "78.3").as_bytes()).unwrap();
        assert_eq!(a.version(), b.version());
        assert_ne!(a.version(), c.version());
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let err = HistoricalDataset::load(Path::new("/nonexistent/dataset.csv")).unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
    }

    #[test]
    fn test_garbage_row_fails_load() {
        let csv = "\
date,oil_price,fx_rate,sugar_price,ethanol_price
2024-01-02,77.5,4.90,not-a-number,2.52
";
        let err = HistoricalDataset::from_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
    }
}
