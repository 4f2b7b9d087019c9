use crate::config::{ModelConfig, ModelType, ScalerKind};
use crate::models::gbdt::GBDTRegressor;
use crate::models::kernel_ridge::KernelRidgeRegressor;
use crate::models::linear::ElasticNetRegressor;
use crate::models::scaled::ScaledRegressor;
use crate::models::Regressor;

/// Build a boxed, unfit regressor from a `ModelConfig`.
///
/// Models with a `scaler` other than `none` are wrapped in a
/// [`ScaledRegressor`] so the scaler is refit whenever the model is.
pub fn build_model(params: &ModelConfig) -> Box<dyn Regressor> {
    let model: Box<dyn Regressor> = match &params.model_type {
        ModelType::Lasso {
            alpha,
            max_iter,
            tol,
        } => Box::new(
            ElasticNetRegressor::lasso(*alpha)
                .with_max_iter(*max_iter)
                .with_tol(*tol),
        ),
        ModelType::ElasticNet {
            alpha,
            l1_ratio,
            max_iter,
            tol,
        } => Box::new(
            ElasticNetRegressor::new(*alpha, *l1_ratio)
                .with_max_iter(*max_iter)
                .with_tol(*tol),
        ),
        ModelType::KernelRidge {
            alpha,
            kernel,
            degree,
            coef0,
            gamma,
        } => Box::new(KernelRidgeRegressor::new(
            *alpha, *kernel, *degree, *coef0, *gamma,
        )),
        ModelType::GBDT { .. } => Box::new(GBDTRegressor::new(params.clone())),
    };

    match params.scaler {
        ScalerKind::None => model,
        kind => Box::new(ScaledRegressor::new(kind, model)),
    }
}
