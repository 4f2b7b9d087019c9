use crate::config::ModelConfig;
use crate::error::{
    check_fit_input, check_predict_width, check_prediction_len, ModelError, Result,
};
use crate::math::{Array1, Array2};
use crate::models::factory::build_model;
use crate::models::Regressor;

struct AveragingState {
    models: Vec<Box<dyn Regressor>>,
    n_features: usize,
}

/// Unweighted mean of several regressors, each fit on the full training data.
pub struct AveragingEnsemble {
    templates: Vec<Box<dyn Regressor>>,
    state: Option<AveragingState>,
}

impl AveragingEnsemble {
    pub fn new(templates: Vec<Box<dyn Regressor>>) -> Result<Self> {
        if templates.is_empty() {
            return Err(ModelError::invalid(
                "averaging ensemble needs at least one model",
            ));
        }
        Ok(AveragingEnsemble {
            templates,
            state: None,
        })
    }

    pub fn from_configs(configs: &[ModelConfig]) -> Result<Self> {
        Self::new(configs.iter().map(build_model).collect())
    }

    pub fn n_models(&self) -> usize {
        self.templates.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

impl Regressor for AveragingEnsemble {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.state = None;
        check_fit_input(x, y)?;

        let mut models = Vec::with_capacity(self.templates.len());
        for (idx, template) in self.templates.iter().enumerate() {
            let mut model = template.fresh();
            model.fit(x, y).map_err(|e| {
                ModelError::upstream(format!("model {} ({})", idx, template.name()), e)
            })?;
            log::debug!("averaging: fitted model {} ({})", idx, template.name());
            models.push(model);
        }

        self.state = Some(AveragingState {
            models,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_width(x, state.n_features)?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for (idx, model) in state.models.iter().enumerate() {
            let stage = || format!("model {} ({})", idx, model.name());
            let preds = model
                .predict(x)
                .map_err(|e| ModelError::upstream(stage(), e))?;
            check_prediction_len(stage, &preds, x.nrows())?;
            sum = sum.add(&preds);
        }
        let n = state.models.len() as f64;
        Ok(sum.mapv(|v| v / n))
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(AveragingEnsemble {
            templates: self.templates.iter().map(|t| t.fresh()).collect(),
            state: None,
        })
    }

    fn name(&self) -> &str {
        "averaging"
    }
}
