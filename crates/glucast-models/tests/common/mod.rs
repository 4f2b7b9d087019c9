#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use glucast_models::error::{ModelError, Result};
use glucast_models::math::{Array1, Array2};
use glucast_models::models::Regressor;

/// Predicts the same value for every row.
#[derive(Clone)]
pub struct ConstantRegressor {
    pub value: f64,
    n_features: Option<usize>,
}

impl ConstantRegressor {
    pub fn new(value: f64) -> Self {
        ConstantRegressor {
            value,
            n_features: None,
        }
    }
}

impl Regressor for ConstantRegressor {
    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n = self.n_features.ok_or(ModelError::NotFitted)?;
        if x.ncols() != n {
            return Err(ModelError::invalid("width mismatch"));
        }
        Ok(Array1::from_elem(x.nrows(), self.value))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(ConstantRegressor::new(self.value))
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Ordinary least squares on the first feature only.
#[derive(Clone, Default)]
pub struct LineRegressor {
    fitted: Option<(f64, f64)>,
}

impl Regressor for LineRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let xs = x.column(0);
        let mx = xs.mean().ok_or_else(|| ModelError::invalid("empty"))?;
        let my = y.mean().ok_or_else(|| ModelError::invalid("empty"))?;
        let sxy: f64 = xs.iter().zip(y.iter()).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sxx: f64 = xs.iter().map(|a| (a - mx).powi(2)).sum();
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        self.fitted = Some((slope, my - slope * mx));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (slope, intercept) = self.fitted.ok_or(ModelError::NotFitted)?;
        Ok(x.column(0).mapv(|v| slope * v + intercept))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(LineRegressor::default())
    }

    fn name(&self) -> &str {
        "line"
    }
}

/// Meta-model stub: predicts the mean of each row's features.
#[derive(Clone, Default)]
pub struct RowMeanRegressor {
    fitted: bool,
}

impl Regressor for RowMeanRegressor {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        Ok(x.mean_axis1())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(RowMeanRegressor::default())
    }

    fn name(&self) -> &str {
        "row_mean"
    }
}

/// One clone's view: the row ids it trained on and the row ids it predicted.
#[derive(Debug, Clone)]
pub struct Observation {
    pub trained_on: Vec<usize>,
    pub predicted: Vec<usize>,
}

/// Treats feature 0 as a row id and logs which ids every clone saw.
#[derive(Clone)]
pub struct RecordingRegressor {
    pub log: Arc<Mutex<Vec<Observation>>>,
    trained_on: Option<Vec<usize>>,
}

impl RecordingRegressor {
    pub fn new() -> Self {
        RecordingRegressor {
            log: Arc::new(Mutex::new(Vec::new())),
            trained_on: None,
        }
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.log.lock().unwrap().clone()
    }
}

fn row_ids(x: &Array2<f64>) -> Vec<usize> {
    x.column(0).iter().map(|&v| v as usize).collect()
}

impl Regressor for RecordingRegressor {
    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        self.trained_on = Some(row_ids(x));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trained_on = self.trained_on.clone().ok_or(ModelError::NotFitted)?;
        let predicted = row_ids(x);
        self.log.lock().unwrap().push(Observation {
            trained_on,
            predicted,
        });
        Ok(Array1::zeros(x.nrows()))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(RecordingRegressor {
            log: Arc::clone(&self.log),
            trained_on: None,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Always fails to fit.
#[derive(Clone, Default)]
pub struct FailingRegressor;

impl Regressor for FailingRegressor {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Err(ModelError::Numerical("boom".to_string()))
    }

    fn predict(&self, _x: &Array2<f64>) -> Result<Array1<f64>> {
        Err(ModelError::NotFitted)
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(FailingRegressor)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Returns one prediction too few whenever asked about `min_rows` rows or more.
#[derive(Clone)]
pub struct ShortRegressor {
    min_rows: usize,
    fitted: bool,
}

impl ShortRegressor {
    pub fn new(min_rows: usize) -> Self {
        ShortRegressor {
            min_rows,
            fitted: false,
        }
    }
}

impl Regressor for ShortRegressor {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        let n = if x.nrows() >= self.min_rows {
            x.nrows().saturating_sub(1)
        } else {
            x.nrows()
        };
        Ok(Array1::from_elem(n, 1.0))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(ShortRegressor::new(self.min_rows))
    }

    fn name(&self) -> &str {
        "short"
    }
}

/// `X = [[0], [1], ..., [n-1]]`, `y = 2x`.
pub fn doubling_data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_vec((n, 1), (0..n).map(|i| i as f64).collect()).unwrap();
    let y = (0..n).map(|i| 2.0 * i as f64).collect();
    (x, y)
}
