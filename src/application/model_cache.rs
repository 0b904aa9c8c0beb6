use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::application::dataset::{DatasetVersion, HistoricalDataset};
use crate::application::model::TrainedModel;
use crate::domain::errors::ValuationError;

/// Process-wide cache of fitted models, keyed by dataset identity.
///
/// Hyperparameters are fixed constants, so the dataset version is the whole
/// key: a model is fitted at most once per dataset content and reused by
/// every interaction until the file changes. Readers hold `Arc` clones;
/// slot replacement is a single map insert under the write lock, so no
/// caller ever observes a partially trained model.
pub struct ModelCache {
    slots: RwLock<HashMap<DatasetVersion, Arc<TrainedModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached model for the dataset's version, fitting it first
    /// if this version has not been seen.
    pub fn get_or_train(
        &self,
        dataset: &HistoricalDataset,
    ) -> Result<Arc<TrainedModel>, ValuationError> {
        let version = dataset.version().clone();

        if let Some(model) = self.get(&version) {
            debug!("ModelCache: hit for version {}", version);
            return Ok(model);
        }

        // Fit outside any lock: training is slow and must not block readers
        // of other versions. A concurrent caller may race to the same fit;
        // both produce identical models (fixed seed) and the second insert
        // is a no-op.
        let model = Arc::new(TrainedModel::fit_dataset(dataset)?);
        info!(
            "ModelCache: trained model for version {} (fit score {:.4})",
            version,
            model.fit_score()
        );

        let mut slots = match self.slots.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = slots.entry(version).or_insert_with(|| model.clone());
        Ok(entry.clone())
    }

    /// Read-only lookup without training.
    pub fn get(&self, version: &DatasetVersion) -> Option<Arc<TrainedModel>> {
        let slots = match self.slots.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.get(version).cloned()
    }

    pub fn len(&self) -> usize {
        let slots = match self.slots.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("slots", &"<RwLock>")
            .finish()
    }
}
