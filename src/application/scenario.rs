use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::model::TrainedModel;
use crate::domain::errors::ValuationError;
use crate::domain::features::FeatureVector;

/// Hydrous ethanol is worth burning when it costs at most ~70% of gasoline
/// per litre (energy-content rule of thumb used at Brazilian pumps).
pub const PARITY_THRESHOLD: f64 = 0.70;

/// Default sensitivity sweep: Brent from 40 to 150 USD/bbl at 50 points.
pub const OIL_SWEEP_RANGE: (f64, f64) = (40.0, 150.0);
pub const OIL_SWEEP_POINTS: usize = 50;

/// One of the model's input drivers, for sweep selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Driver {
    Oil,
    Fx,
    Sugar,
    Month,
}

/// A hypothetical market state, detached from any historical date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverValues {
    pub oil: f64,
    pub fx: f64,
    pub sugar: f64,
    pub month: u32,
}

impl DriverValues {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::build(self.oil, self.fx, self.sugar, self.month)
    }

    /// Copy with one driver replaced. Month values are rounded and clamped
    /// to 1..=12, so sweeping the seasonal axis stays well formed.
    pub fn with_driver(&self, driver: Driver, value: f64) -> Self {
        let mut next = *self;
        match driver {
            Driver::Oil => next.oil = value,
            Driver::Fx => next.fx = value,
            Driver::Sugar => next.sugar = value,
            Driver::Month => next.month = value.round().clamp(1.0, 12.0) as u32,
        }
        next
    }
}

/// Fair value for a single scenario: one feature build, one forward pass.
pub fn point_estimate(
    model: &TrainedModel,
    drivers: &DriverValues,
) -> Result<f64, ValuationError> {
    model.predict(&drivers.features())
}

/// Builds a sweep of one driver across `range` (inclusive endpoints) with
/// all other drivers held fixed. Lazy and restartable: the returned iterator
/// predicts on demand and a clone starts over from its current cursor, so
/// dropping it mid-sweep simply discards the untaken points.
pub fn sweep(
    model: Arc<TrainedModel>,
    fixed: DriverValues,
    driver: Driver,
    range: (f64, f64),
    n_points: usize,
) -> Result<SensitivitySweep, ValuationError> {
    let (lo, hi) = range;
    if n_points < 2 {
        return Err(ValuationError::InvalidInput {
            reason: format!("sweep needs at least 2 points, got {}", n_points),
        });
    }
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(ValuationError::InvalidInput {
            reason: format!("invalid sweep range [{}, {}]", lo, hi),
        });
    }

    Ok(SensitivitySweep {
        model,
        fixed,
        driver,
        lo,
        step: (hi - lo) / (n_points - 1) as f64,
        n_points,
        cursor: 0,
    })
}

/// Lazy response curve over one driver. Points are independent of each
/// other; `next` runs exactly one prediction.
#[derive(Clone)]
pub struct SensitivitySweep {
    model: Arc<TrainedModel>,
    fixed: DriverValues,
    driver: Driver,
    lo: f64,
    step: f64,
    n_points: usize,
    cursor: usize,
}

impl Iterator for SensitivitySweep {
    type Item = Result<(f64, f64), ValuationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.n_points {
            return None;
        }
        // Last point lands exactly on the upper endpoint
        let x = if self.cursor == self.n_points - 1 {
            self.lo + self.step * (self.n_points - 1) as f64
        } else {
            self.lo + self.step * self.cursor as f64
        };
        self.cursor += 1;

        let scenario = self.fixed.with_driver(self.driver, x);
        Some(point_estimate(&self.model, &scenario).map(|y| (x, y)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_points - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SensitivitySweep {}

/// Price ratio of a substitute good pair, e.g. ethanol over gasoline at the
/// pump. Unit independent: both prices must simply share a unit.
pub fn parity_ratio(price_a: f64, price_b: f64) -> Result<f64, ValuationError> {
    if !price_a.is_finite() || !price_b.is_finite() {
        return Err(ValuationError::InvalidInput {
            reason: "parity ratio inputs must be finite".to_string(),
        });
    }
    if price_b <= 0.0 {
        return Err(ValuationError::InvalidInput {
            reason: format!("parity ratio denominator must be positive, got {}", price_b),
        });
    }
    Ok(price_a / price_b)
}

/// Binary competitiveness call derived from the parity ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityStatus {
    Favorable,
    Unfavorable,
}

impl ParityStatus {
    pub fn classify(ratio: f64) -> Self {
        if ratio <= PARITY_THRESHOLD {
            ParityStatus::Favorable
        } else {
            ParityStatus::Unfavorable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FEATURE_COUNT;

    fn fitted_model() -> Arc<TrainedModel> {
        let samples: Vec<(FeatureVector, f64)> = (0..60)
            .map(|i| {
                let oil = 50.0 + i as f64;
                let fx = 4.5 + (i % 10) as f64 * 0.05;
                let sugar = 18.0 + (i % 8) as f64;
                let fv = FeatureVector::build(oil, fx, sugar, (i % 12) as u32 + 1);
                (fv, 0.02 * oil + 0.3 * fx - 0.01 * sugar)
            })
            .collect();
        Arc::new(TrainedModel::fit(&samples).unwrap())
    }

    fn scenario() -> DriverValues {
        DriverValues {
            oil: 90.0,
            fx: 4.9,
            sugar: 21.0,
            month: 6,
        }
    }

    #[test]
    fn test_sweep_shape() {
        let model = fitted_model();
        let points: Vec<(f64, f64)> = sweep(model, scenario(), Driver::Oil, (40.0, 150.0), 50)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(points.len(), 50);
        assert!((points[0].0 - 40.0).abs() < 1e-9);
        assert!((points[49].0 - 150.0).abs() < 1e-9);
        for pair in points.windows(2) {
            assert!(pair[1].0 > pair[0].0, "swept axis must be increasing");
        }
    }

    #[test]
    fn test_sweep_is_restartable() {
        let model = fitted_model();
        let fresh = sweep(model, scenario(), Driver::Oil, (40.0, 150.0), 10).unwrap();
        let mut partial = fresh.clone();
        partial.next();
        partial.next();

        let rerun: Vec<_> = fresh.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(rerun.len(), 10);
        assert_eq!(partial.len(), 8);
    }

    #[test]
    fn test_sweep_rejects_bad_inputs() {
        let model = fitted_model();
        assert!(matches!(
            sweep(model.clone(), scenario(), Driver::Oil, (40.0, 150.0), 1),
            Err(ValuationError::InvalidInput { .. })
        ));
        assert!(matches!(
            sweep(model.clone(), scenario(), Driver::Oil, (150.0, 40.0), 10),
            Err(ValuationError::InvalidInput { .. })
        ));
        assert!(matches!(
            sweep(model, scenario(), Driver::Oil, (f64::NAN, 40.0), 10),
            Err(ValuationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_month_sweep_stays_in_calendar() {
        let base = scenario();
        assert_eq!(base.with_driver(Driver::Month, 0.2).month, 1);
        assert_eq!(base.with_driver(Driver::Month, 6.6).month, 7);
        assert_eq!(base.with_driver(Driver::Month, 99.0).month, 12);
    }

    #[test]
    fn test_point_estimate_uses_shared_builder() {
        let model = fitted_model();
        let drivers = scenario();
        let direct = model.predict(&drivers.features()).unwrap();
        assert_eq!(point_estimate(&model, &drivers).unwrap(), direct);
        assert_eq!(drivers.features().as_row().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_parity_ratio() {
        let ratio = parity_ratio(3.60, 5.80).unwrap();
        assert!((ratio - 0.6207).abs() < 1e-3);
        assert_eq!(ParityStatus::classify(ratio), ParityStatus::Favorable);
        assert_eq!(ParityStatus::classify(0.85), ParityStatus::Unfavorable);
    }

    #[test]
    fn test_parity_ratio_rejects_bad_denominator() {
        assert!(matches!(
            parity_ratio(3.60, 0.0),
            Err(ValuationError::InvalidInput { .. })
        ));
        assert!(matches!(
            parity_ratio(3.60, -1.0),
            Err(ValuationError::InvalidInput { .. })
        ));
        assert!(matches!(
            parity_ratio(f64::NAN, 2.0),
            Err(ValuationError::InvalidInput { .. })
        ));
    }
}
