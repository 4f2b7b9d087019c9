use thiserror::Error;

/// Result alias used by every regressor and ensemble in the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Failures raised at the `Regressor` boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Shape mismatches, too few samples for the fold count, non-finite values
    /// or invalid hyper-parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model not fitted: call `fit` before `predict`")]
    NotFitted,

    /// A nested model failed; `stage` names the model index, name and fold.
    #[error("{stage} failed")]
    Upstream {
        stage: String,
        #[source]
        source: Box<ModelError>,
    },

    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl ModelError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ModelError::InvalidInput(msg.into())
    }

    pub fn upstream<S: Into<String>>(stage: S, source: ModelError) -> Self {
        ModelError::Upstream {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Walk `Upstream` wrappers down to the failure that started the chain.
    pub fn root_cause(&self) -> &ModelError {
        match self {
            ModelError::Upstream { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Shared shape checks for `fit` implementations.
pub(crate) fn check_fit_input(
    x: &crate::math::Array2<f64>,
    y: &crate::math::Array1<f64>,
) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ModelError::invalid(format!(
            "feature matrix has {} rows but target has {} values",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(ModelError::invalid("cannot fit on an empty feature matrix"));
    }
    if !x.all_finite() || !y.all_finite() {
        return Err(ModelError::invalid(
            "features and target must be finite (impute missing values first)",
        ));
    }
    Ok(())
}

/// Shared width check for `predict` implementations.
pub(crate) fn check_predict_width(x: &crate::math::Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ModelError::invalid(format!(
            "expected {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    if !x.all_finite() {
        return Err(ModelError::invalid("features must be finite"));
    }
    Ok(())
}

/// A child model must return exactly one prediction per row it was given.
pub(crate) fn check_prediction_len(
    stage: impl FnOnce() -> String,
    predictions: &crate::math::Array1<f64>,
    n_rows: usize,
) -> Result<()> {
    if predictions.len() != n_rows {
        return Err(ModelError::upstream(
            stage(),
            ModelError::invalid(format!(
                "returned {} predictions for {} rows",
                predictions.len(),
                n_rows
            )),
        ));
    }
    Ok(())
}
