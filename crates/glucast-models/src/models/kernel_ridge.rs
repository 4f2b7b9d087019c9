//! Kernel ridge regression solved in the dual.
//!
//! Fitting solves `(K + alpha * I) c = y` for the dual coefficients `c`, where
//! `K` is the kernel matrix of the training rows. Predictions are
//! `K(x_new, X_train) c`. As with the usual formulation there is no intercept,
//! so targets far from zero are best served by a kernel with a constant term
//! (e.g. a polynomial kernel with `coef0 > 0`).

use crate::config::KernelType;
use crate::error::{check_fit_input, check_predict_width, ModelError, Result};
use crate::math::{Array1, Array2};
use crate::models::Regressor;

/// Kernel function with resolved parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    pub kind: KernelType,
    pub degree: i32,
    pub coef0: f64,
    pub gamma: f64,
}

impl Kernel {
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match self.kind {
            KernelType::Linear => dot(a, b),
            KernelType::Polynomial => (self.gamma * dot(a, b) + self.coef0).powi(self.degree),
            KernelType::Rbf => {
                let sq: f64 = a.iter().zip(b).map(|(x, z)| (x - z) * (x - z)).sum();
                (-self.gamma * sq).exp()
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, z)| x * z).sum()
}

#[derive(Debug, Clone)]
struct DualFit {
    kernel: Kernel,
    support: Array2<f64>,
    dual_coef: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct KernelRidgeRegressor {
    alpha: f64,
    kind: KernelType,
    degree: i32,
    coef0: f64,
    gamma: Option<f64>,
    fitted: Option<DualFit>,
}

impl KernelRidgeRegressor {
    pub fn new(alpha: f64, kind: KernelType, degree: i32, coef0: f64, gamma: Option<f64>) -> Self {
        KernelRidgeRegressor {
            alpha,
            kind,
            degree,
            coef0,
            gamma,
            fitted: None,
        }
    }

    /// Kernel with `gamma` resolved against the fitted feature count.
    pub fn kernel(&self) -> Option<Kernel> {
        self.fitted.as_ref().map(|f| f.kernel)
    }
}

/// Solve `a x = b` for symmetric positive-definite `a` (row-major, `n x n`)
/// via a Cholesky factorization.
fn cholesky_solve(a: &[f64], b: &[f64], n: usize) -> Result<Vec<f64>> {
    let mut l = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            if i == j {
                let diag = a[i * n + i] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(ModelError::Numerical(format!(
                        "kernel system is not positive definite (pivot {} = {:e})",
                        i, diag
                    )));
                }
                l[i * n + j] = diag.sqrt();
            } else {
                l[i * n + j] = (a[i * n + j] - sum) / l[j * n + j];
            }
        }
    }

    // L z = b
    let mut z = vec![0.0f64; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i * n + j] * z[j]).sum();
        z[i] = (b[i] - sum) / l[i * n + i];
    }
    // L^T x = z
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j * n + i] * x[j]).sum();
        x[i] = (z[i] - sum) / l[i * n + i];
    }
    Ok(x)
}

impl Regressor for KernelRidgeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fitted = None;
        check_fit_input(x, y)?;
        if self.alpha < 0.0 {
            return Err(ModelError::invalid(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let n = x.nrows();
        let kernel = Kernel {
            kind: self.kind,
            degree: self.degree,
            coef0: self.coef0,
            gamma: self.gamma.unwrap_or(1.0 / x.ncols().max(1) as f64),
        };
        log::trace!("kernel_ridge: building {}x{} kernel matrix", n, n);

        let mut gram = vec![0.0f64; n * n];
        for i in 0..n {
            let row_i = x.row_slice(i);
            for j in 0..=i {
                let v = kernel.eval(row_i, x.row_slice(j));
                gram[i * n + j] = v;
                gram[j * n + i] = v;
            }
            gram[i * n + i] += self.alpha;
        }

        let dual_coef = cholesky_solve(&gram, y.as_slice(), n)?;
        if dual_coef.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Numerical(
                "kernel ridge produced non-finite dual coefficients".to_string(),
            ));
        }

        self.fitted = Some(DualFit {
            kernel,
            support: x.clone(),
            dual_coef,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fit = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_width(x, fit.support.ncols())?;
        Ok(x
            .rows()
            .map(|row| {
                fit.support
                    .rows()
                    .zip(fit.dual_coef.iter())
                    .map(|(sv, c)| c * fit.kernel.eval(row, sv))
                    .sum()
            })
            .collect())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(KernelRidgeRegressor {
            fitted: None,
            ..self.clone()
        })
    }

    fn name(&self) -> &str {
        "kernel_ridge"
    }
}
