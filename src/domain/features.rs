/// Ordered list of model input columns.
/// This order MUST match exactly between training and prediction.
/// Any change here is a breaking change for cached models.
pub const FEATURE_NAMES: &[&str] = &["brent_oil", "fx_rate", "sugar", "month"];

/// The number of model inputs, pinned to the schema constant.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// A fixed-order model input vector. The only way to obtain one is
/// [`FeatureVector::build`], so every caller (historical training rows,
/// live quotes, user scenarios) goes through the same code path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    oil: f64,
    fx: f64,
    sugar: f64,
    month: f64,
}

impl FeatureVector {
    /// Builds an input vector in schema order. Pure and total: no
    /// validation happens here, out-of-range values are the caller's
    /// concern (the forest extrapolates via leaf averaging anyway).
    pub fn build(oil: f64, fx: f64, sugar: f64, month: u32) -> Self {
        Self {
            oil,
            fx,
            sugar,
            month: month as f64,
        }
    }

    /// The row handed to the regressor, in `FEATURE_NAMES` order.
    pub fn as_row(&self) -> [f64; FEATURE_COUNT] {
        [self.oil, self.fx, self.sugar, self.month]
    }

    pub fn oil(&self) -> f64 {
        self.oil
    }

    pub fn fx(&self) -> f64 {
        self.fx
    }

    pub fn sugar(&self) -> f64 {
        self.sugar
    }

    pub fn month(&self) -> u32 {
        self.month as u32
    }
}
