//! L1/L2 penalized linear regression fitted by cyclic coordinate descent.
//!
//! Minimizes `1/(2n) * ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1
//! + alpha * (1 - l1_ratio) / 2 * ||w||^2`, with the intercept `b` recovered
//! from the column means. `l1_ratio = 1` is the lasso.

use crate::error::{check_fit_input, check_predict_width, ModelError, Result};
use crate::math::{Array1, Array2};
use crate::models::Regressor;

#[derive(Debug, Clone)]
struct LinearFit {
    coefficients: Array1<f64>,
    intercept: f64,
}

/// Elastic net (and lasso) regressor.
#[derive(Debug, Clone)]
pub struct ElasticNetRegressor {
    alpha: f64,
    l1_ratio: f64,
    max_iter: usize,
    tol: f64,
    fitted: Option<LinearFit>,
}

impl ElasticNetRegressor {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        ElasticNetRegressor {
            alpha,
            l1_ratio: l1_ratio.clamp(0.0, 1.0),
            max_iter: 1000,
            tol: 1e-4,
            fitted: None,
        }
    }

    pub fn lasso(alpha: f64) -> Self {
        Self::new(alpha, 1.0)
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.coefficients.as_slice())
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }

    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }
}

impl Regressor for ElasticNetRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fitted = None;
        check_fit_input(x, y)?;
        if self.alpha < 0.0 {
            return Err(ModelError::invalid(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let n = n_samples as f64;

        let x_mean = x
            .mean_axis0()
            .ok_or_else(|| ModelError::invalid("empty feature matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);

        // Centred columns, stored column-major for the coordinate sweeps.
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|j| x.column(j).iter().map(|v| v - x_mean[j]).collect())
            .collect();
        let col_norms: Vec<f64> = columns
            .iter()
            .map(|c| c.iter().map(|v| v * v).sum())
            .collect();

        let l1_penalty = self.alpha * self.l1_ratio * n;
        let l2_penalty = self.alpha * (1.0 - self.l1_ratio) * n;

        let mut w = vec![0.0f64; n_features];
        let mut residual: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
        let mut converged = false;

        for iter in 0..self.max_iter {
            let mut max_delta = 0.0f64;
            for j in 0..n_features {
                let denom = col_norms[j] + l2_penalty;
                if denom < 1e-15 {
                    continue;
                }
                let column = &columns[j];
                let rho = column
                    .iter()
                    .zip(residual.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    + col_norms[j] * w[j];
                let updated = Self::soft_threshold(rho, l1_penalty) / denom;
                let delta = updated - w[j];
                if delta != 0.0 {
                    for (r, v) in residual.iter_mut().zip(column.iter()) {
                        *r -= delta * v;
                    }
                    w[j] = updated;
                }
                max_delta = max_delta.max(delta.abs());
            }
            if max_delta < self.tol {
                log::trace!("{} converged after {} iterations", self.name(), iter + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            log::debug!(
                "{} did not converge within {} iterations",
                self.name(),
                self.max_iter
            );
        }

        let coefficients = Array1::from_vec(w);
        let intercept = y_mean - coefficients.dot(&x_mean);
        self.fitted = Some(LinearFit {
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fit = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_width(x, fit.coefficients.len())?;
        Ok(x.dot(&fit.coefficients).mapv(|v| v + fit.intercept))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(ElasticNetRegressor {
            fitted: None,
            ..self.clone()
        })
    }

    fn name(&self) -> &str {
        if self.l1_ratio >= 1.0 {
            "lasso"
        } else {
            "elastic_net"
        }
    }
}
