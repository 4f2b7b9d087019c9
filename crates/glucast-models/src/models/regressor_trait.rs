use crate::error::Result;
use crate::math::{Array1, Array2};

/// The fit/predict contract shared by every regressor in the crate.
///
/// Ensembles implement this trait as well, so an averaging or stacking
/// ensemble can be used as a base model inside another ensemble.
pub trait Regressor: Send + Sync {
    /// Fit on `x` (n_samples x n_features) and `y` (n_samples). Any state from
    /// a previous fit is discarded.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`. Fails with `NotFitted` before a
    /// successful `fit` and with `InvalidInput` on a feature width mismatch.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// A new, unfit instance with the same configuration.
    fn fresh(&self) -> Box<dyn Regressor>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "regressor"
    }
}
