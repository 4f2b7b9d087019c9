//! Regression error metrics.
//!
//! All functions take predictions and observations of equal length and
//! return `None` when the inputs are empty or of different length.

use crate::math::Array1;

fn paired<'a>(
    predicted: &'a Array1<f64>,
    observed: &'a Array1<f64>,
) -> Option<impl Iterator<Item = (f64, f64)> + 'a> {
    if predicted.is_empty() || predicted.len() != observed.len() {
        return None;
    }
    Some(predicted.iter().copied().zip(observed.iter().copied()))
}

/// Mean squared error.
pub fn mse(predicted: &Array1<f64>, observed: &Array1<f64>) -> Option<f64> {
    let n = predicted.len() as f64;
    paired(predicted, observed).map(|it| it.map(|(p, o)| (p - o).powi(2)).sum::<f64>() / n)
}

/// Root mean squared error.
pub fn rmse(predicted: &Array1<f64>, observed: &Array1<f64>) -> Option<f64> {
    mse(predicted, observed).map(f64::sqrt)
}

/// Half the mean squared error.
///
/// This is the scoring convention of the glucose challenge leaderboard:
/// `sum((p - o)^2) / (2n)`. Call it on raw-scale values; it is *not* a
/// logarithmic error despite the name.
pub fn msle(predicted: &Array1<f64>, observed: &Array1<f64>) -> Option<f64> {
    mse(predicted, observed).map(|m| m / 2.0)
}

/// Coefficient of determination. `None` for a constant `observed`.
pub fn r2(predicted: &Array1<f64>, observed: &Array1<f64>) -> Option<f64> {
    let mean = observed.mean()?;
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return None;
    }
    let ss_res = mse(predicted, observed)? * observed.len() as f64;
    Some(1.0 - ss_res / ss_tot)
}
