use crate::config::ScalerKind;
use crate::error::{check_fit_input, check_predict_width, ModelError, Result};
use crate::math::{Array1, Array2};
use crate::models::Regressor;
use crate::preprocessing::{fit_scaler, transform_all, RobustScaler, Scaler};

#[derive(Debug, Clone)]
enum FittedScaler {
    Standard(Scaler),
    Robust(RobustScaler),
}

impl FittedScaler {
    fn fit(kind: ScalerKind, x: &Array2<f64>) -> Option<Self> {
        match kind {
            ScalerKind::None => None,
            ScalerKind::Standard => Some(FittedScaler::Standard(fit_scaler(x))),
            ScalerKind::Robust => Some(FittedScaler::Robust(RobustScaler::fit(x))),
        }
    }

    fn width(&self) -> usize {
        match self {
            FittedScaler::Standard(s) => s.mean.len(),
            FittedScaler::Robust(s) => s.center.len(),
        }
    }

    fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            FittedScaler::Standard(s) => transform_all(x, s),
            FittedScaler::Robust(s) => s.transform(x),
        }
    }
}

/// A regressor preceded by a feature scaler.
///
/// The scaler is fitted on the rows passed to `fit` only, so inside a fold
/// loop it never sees held-out rows.
pub struct ScaledRegressor {
    kind: ScalerKind,
    inner: Box<dyn Regressor>,
    scaler: Option<FittedScaler>,
    fitted: bool,
}

impl ScaledRegressor {
    pub fn new(kind: ScalerKind, inner: Box<dyn Regressor>) -> Self {
        ScaledRegressor {
            kind,
            inner,
            scaler: None,
            fitted: false,
        }
    }

    pub fn scaler_kind(&self) -> ScalerKind {
        self.kind
    }
}

impl Regressor for ScaledRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fitted = false;
        self.scaler = None;
        check_fit_input(x, y)?;

        let scaler = FittedScaler::fit(self.kind, x);
        match &scaler {
            Some(s) => self.inner.fit(&s.transform(x), y)?,
            None => self.inner.fit(x, y)?,
        }
        self.scaler = scaler;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        match &self.scaler {
            Some(s) => {
                check_predict_width(x, s.width())?;
                self.inner.predict(&s.transform(x))
            }
            None => self.inner.predict(x),
        }
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(ScaledRegressor::new(self.kind, self.inner.fresh()))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
