//! Feature preprocessing shared by the pipeline and the model wrappers.
//!
//! Provides per-column scalers (standard and robust), median imputation of
//! missing cells, and Box-Cox skew correction. Missing values are encoded as
//! `NaN` in the crate `Array2<f64>`.

use statrs::statistics::{Data, Median, OrderStatistics};

use crate::math::{Array1, Array2};

/// Minimum scale to avoid division by zero when transforming.
const MIN_SCALE: f64 = 1e-6;

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Fit a `Scaler` from an `Array2<f64>` where rows are samples and
/// columns are features.
pub fn fit_scaler(x: &Array2<f64>) -> Scaler {
    let (nrows, ncols) = x.shape();
    assert!(
        nrows > 0 && ncols > 0,
        "fit_scaler requires non-empty matrix"
    );

    let mut mean = vec![0.0f64; ncols];
    for r in 0..nrows {
        for c in 0..ncols {
            mean[c] += x[(r, c)];
        }
    }
    let nrows_f = nrows as f64;
    for v in mean.iter_mut() {
        *v /= nrows_f;
    }

    let mut var = vec![0.0f64; ncols];
    for r in 0..nrows {
        for c in 0..ncols {
            let d = x[(r, c)] - mean[c];
            var[c] += d * d;
        }
    }
    for v in var.iter_mut() {
        *v = (*v / nrows_f).sqrt().max(MIN_SCALE);
    }

    Scaler { mean, std: var }
}

/// Transform all rows using the provided `Scaler` and return a new `Array2<f64>`.
pub fn transform_all(x: &Array2<f64>, sc: &Scaler) -> Array2<f64> {
    let mut out = x.clone();
    for r in 0..out.nrows() {
        for (c, v) in out.row_slice_mut(r).iter_mut().enumerate() {
            *v = (*v - sc.mean[c]) / sc.std[c];
        }
    }
    out
}

/// Outlier-resistant scaler: subtracts the column median and divides by the
/// interquartile range. Columns with a zero IQR are only centred.
#[derive(Clone, Debug, PartialEq)]
pub struct RobustScaler {
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl RobustScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let mut center = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for c in 0..x.ncols() {
            let mut data = Data::new(x.column(c).to_vec());
            center.push(data.median());
            let iqr = data.upper_quartile() - data.lower_quartile();
            scale.push(if iqr.abs() < MIN_SCALE { 1.0 } else { iqr });
        }
        RobustScaler { center, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        assert_eq!(x.ncols(), self.center.len(), "RobustScaler: width mismatch");
        let mut out = x.clone();
        for r in 0..out.nrows() {
            for (c, v) in out.row_slice_mut(r).iter_mut().enumerate() {
                *v = (*v - self.center[c]) / self.scale[c];
            }
        }
        out
    }
}

/// Median of the finite values in `values`, `None` when there are none.
pub fn nan_median(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(Data::new(finite).median())
}

/// Replace `NaN` cells with their column median.
///
/// Columns without a single observed value are filled with zero. Returns the
/// per-column fill values.
pub fn impute_median(x: &mut Array2<f64>) -> Vec<f64> {
    let mut fills = Vec::with_capacity(x.ncols());
    for c in 0..x.ncols() {
        let column = x.column(c);
        let fill = match nan_median(column.as_slice()) {
            Some(m) => m,
            None => {
                log::warn!("Column {} has no observed values; filling with 0", c);
                0.0
            }
        };
        let missing = column.iter().filter(|v| v.is_nan()).count();
        if missing > 0 {
            log::trace!("Imputing {} missing cells in column {} with {}", missing, c, fill);
            for r in 0..x.nrows() {
                if x[(r, c)].is_nan() {
                    x[(r, c)] = fill;
                }
            }
        }
        fills.push(fill);
    }
    fills
}

/// Biased (Fisher-Pearson) sample skewness, `m3 / m2^1.5`, over finite values.
///
/// Returns 0 for constant or empty input.
pub fn skewness(values: &[f64]) -> f64 {
    let finite: Array1<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(mean) = finite.mean() else {
        return 0.0;
    };
    let n = finite.len() as f64;
    let m2 = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = finite.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// One-parameter Box-Cox transform of `1 + x`.
pub fn boxcox1p(x: f64, lambda: f64) -> f64 {
    if lambda.abs() < 1e-12 {
        x.ln_1p()
    } else {
        ((1.0 + x).powf(lambda) - 1.0) / lambda
    }
}

/// Apply `boxcox1p` to every column whose absolute skewness exceeds
/// `threshold`, or to every column when `threshold` is `None`. Returns the
/// indices of transformed columns.
///
/// Columns holding values at or below -1 are outside the transform's domain
/// and are left untouched.
pub fn correct_skew(x: &mut Array2<f64>, threshold: Option<f64>, lambda: f64) -> Vec<usize> {
    let mut transformed = Vec::new();
    for c in 0..x.ncols() {
        let column = x.column(c);
        let skew = skewness(column.as_slice());
        if threshold.is_some_and(|t| skew.abs() <= t) {
            continue;
        }
        if column.iter().any(|&v| v <= -1.0) {
            log::warn!(
                "Column {} (skew {:.3}) holds values <= -1; skipping Box-Cox",
                c,
                skew
            );
            continue;
        }
        let values: Vec<f64> = column.iter().map(|&v| boxcox1p(v, lambda)).collect();
        x.set_column(c, &values);
        transformed.push(c);
    }
    match threshold {
        Some(t) => log::debug!(
            "Box-Cox transformed {} of {} columns (|skew| > {})",
            transformed.len(),
            x.ncols(),
            t
        ),
        None => log::debug!(
            "Box-Cox transformed {} of {} columns (no skew threshold)",
            transformed.len(),
            x.ncols()
        ),
    }
    transformed
}
