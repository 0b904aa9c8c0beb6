use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::application::dataset::HistoricalDataset;
use crate::domain::errors::ValuationError;
use crate::domain::features::{FeatureVector, FEATURE_COUNT};

/// Minimum clean rows needed before a fit is attempted. Below this the
/// forest would just memorize noise and the fit score would be meaningless.
pub const MIN_TRAINING_ROWS: usize = 24;

/// Fixed hyperparameters. These are part of the model version, not tuning
/// knobs, so they are not config and not part of the cache key.
const N_TREES: usize = 200;
const MAX_DEPTH: u16 = 12;
const SEED: u64 = 42;

/// A fitted valuation model. Immutable once produced; a new dataset version
/// requires a new fit. Shared read-only behind `Arc` by the model cache.
pub struct TrainedModel {
    forest: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    fit_score: f64,
    n_features: usize,
}

impl TrainedModel {
    /// Fits the forest on every sample, no holdout: the intended use is
    /// curve fitting for interpolation and mild extrapolation, not
    /// generalization claims. `fit_score` is the in-sample R², surfaced to
    /// the user as a confidence hint only.
    pub fn fit(samples: &[(FeatureVector, f64)]) -> Result<Self, ValuationError> {
        if samples.len() < MIN_TRAINING_ROWS {
            return Err(ValuationError::InsufficientData {
                rows: samples.len(),
                min: MIN_TRAINING_ROWS,
            });
        }

        let x: Vec<Vec<f64>> = samples.iter().map(|(fv, _)| fv.as_row().to_vec()).collect();
        let y: Vec<f64> = samples.iter().map(|(_, target)| *target).collect();

        let x_matrix =
            DenseMatrix::from_2d_vec(&x).map_err(|e| ValuationError::TrainingFailed {
                reason: format!("matrix construction: {}", e),
            })?;

        let params = RandomForestRegressorParameters::default()
            .with_n_trees(N_TREES)
            .with_max_depth(MAX_DEPTH)
            .with_seed(SEED);

        info!(
            "Training random forest ({} trees, depth {}) on {} rows",
            N_TREES,
            MAX_DEPTH,
            samples.len()
        );

        let forest = RandomForestRegressor::fit(&x_matrix, &y, params).map_err(|e| {
            ValuationError::TrainingFailed {
                reason: e.to_string(),
            }
        })?;

        let predictions = forest
            .predict(&x_matrix)
            .map_err(|e| ValuationError::TrainingFailed {
                reason: format!("in-sample scoring: {}", e),
            })?;
        let fit_score = r_squared(&y, &predictions);

        info!("Training complete, in-sample R² = {:.4}", fit_score);

        Ok(Self {
            forest,
            fit_score,
            n_features: FEATURE_COUNT,
        })
    }

    /// Convenience fit from a loaded dataset, target = observed ethanol
    /// price. Every row goes through `HistoricalRecord::features`, the same
    /// builder used at prediction time.
    pub fn fit_dataset(dataset: &HistoricalDataset) -> Result<Self, ValuationError> {
        let samples: Vec<(FeatureVector, f64)> = dataset
            .records()
            .iter()
            .map(|r| (r.features(), r.ethanol))
            .collect();
        Self::fit(&samples)
    }

    /// Predicts a price for one scenario. Deterministic, never mutates the
    /// model. Values outside the training range are accepted: the forest
    /// extrapolates by averaging the nearest leaves, which is exactly what
    /// the sensitivity sweep relies on at its range edges.
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64, ValuationError> {
        self.predict_row(&vector.as_row())
    }

    /// Row-level prediction with the arity check. The schema mismatch arm
    /// is unreachable from `predict` since `FeatureVector` rows are fixed
    /// size; it guards hand-built rows and future schema edits.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ValuationError> {
        if row.len() != self.n_features {
            return Err(ValuationError::SchemaMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let matrix = DenseMatrix::from_2d_vec(&vec![row.to_vec()]).map_err(|e| {
            ValuationError::InvalidInput {
                reason: format!("matrix construction: {}", e),
            }
        })?;
        let predictions = self
            .forest
            .predict(&matrix)
            .map_err(|e| ValuationError::InvalidInput {
                reason: e.to_string(),
            })?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| ValuationError::InvalidInput {
                reason: "empty prediction batch".to_string(),
            })
    }

    /// In-sample coefficient of determination.
    pub fn fit_score(&self) -> f64 {
        self.fit_score
    }
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("fit_score", &self.fit_score)
            .field("n_features", &self.n_features)
            .finish()
    }
}

fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}
