use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use crate::config::{ModelConfig, ModelType};
use crate::error::{check_fit_input, check_predict_width, ModelError, Result};
use crate::math::{Array1, Array2};
use crate::models::Regressor;

/// Gradient Boosting Decision Tree (GBDT) regressor
///
/// The target is centred before boosting and the mean added back on
/// prediction, so the first trees don't have to learn the offset.
pub struct GBDTRegressor {
    model: Option<FittedGbdt>,
    params: ModelConfig,
}

struct FittedGbdt {
    gbdt: GBDT,
    n_features: usize,
    offset: f64,
}

impl GBDTRegressor {
    pub fn new(params: ModelConfig) -> Self {
        GBDTRegressor {
            model: None,
            params,
        }
    }

    fn build_config(&self, feature_size: usize) -> Result<Config> {
        match &self.params.model_type {
            ModelType::GBDT {
                learning_rate,
                max_depth,
                num_boost_round,
                min_leaf_size,
                data_sample_ratio,
                feature_sample_ratio,
                debug,
                training_optimization_level,
                loss_type,
            } => {
                let mut config = Config::new();

                config.set_feature_size(feature_size);
                config.set_shrinkage(*learning_rate);
                config.set_max_depth(*max_depth);
                config.set_iterations(*num_boost_round as usize);
                config.set_min_leaf_size(*min_leaf_size);
                config.set_data_sample_ratio(*data_sample_ratio);
                config.set_feature_sample_ratio(*feature_sample_ratio);
                config.set_debug(*debug);
                config.set_training_optimization_level(*training_optimization_level);
                config.set_loss(loss_type);
                Ok(config)
            }
            other => Err(ModelError::invalid(format!(
                "expected GBDT parameters, got {}",
                other
            ))),
        }
    }

    fn to_data_vec(x: &Array2<f64>, labels: Option<&[f64]>) -> DataVec {
        let mut out = DataVec::with_capacity(x.nrows());
        for (i, row) in x.rows().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = labels.map_or(0.0, |l| l[i] as f32);
            out.push(Data::new_training_data(features, 1.0, label, None));
        }
        out
    }
}

impl Regressor for GBDTRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.model = None;
        check_fit_input(x, y)?;
        let config = self.build_config(x.ncols())?;

        let offset = y.mean().unwrap_or(0.0);
        let centred: Vec<f64> = y.iter().map(|v| v - offset).collect();
        let mut train_x = Self::to_data_vec(x, Some(&centred));

        let mut gbdt = GBDT::new(&config);
        gbdt.fit(&mut train_x);

        self.model = Some(FittedGbdt {
            gbdt,
            n_features: x.ncols(),
            offset,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fitted = self.model.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_width(x, fitted.n_features)?;
        let test_x = Self::to_data_vec(x, None);
        let predictions = fitted.gbdt.predict(&test_x);
        let out: Array1<f64> = predictions
            .iter()
            .map(|&p| p as f64 + fitted.offset)
            .collect();
        if !out.all_finite() {
            return Err(ModelError::Numerical(
                "gbdt produced non-finite predictions".to_string(),
            ));
        }
        Ok(out)
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(GBDTRegressor::new(self.params.clone()))
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> ModelConfig {
        ModelConfig::new(ModelType::GBDT {
            learning_rate: 0.3,
            max_depth: 3,
            num_boost_round: 50,
            min_leaf_size: 1,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 1.0,
            debug: false,
            training_optimization_level: 2,
            loss_type: "SquaredError".to_string(),
        })
    }

    #[test]
    fn test_gbdt_regressor_step_function() {
        // Target is a step in the first feature; the second feature is noise.
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 13) % 7) as f64])
            .collect();
        let y: Array1<f64> = rows
            .iter()
            .map(|r| if r[0] < 20.0 { 5.0 } else { 9.0 })
            .collect();
        let x = Array2::from_rows(rows).unwrap();

        let mut model = GBDTRegressor::new(small_params());
        model.fit(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();

        assert_eq!(predictions.len(), y.len());
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.5, "prediction {} too far from {}", p, t);
        }
    }

    #[test]
    fn test_gbdt_rejects_foreign_params() {
        let params = ModelConfig::new("lasso".parse().unwrap());
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0]);
        let mut model = GBDTRegressor::new(params);
        assert!(matches!(model.fit(&x, &y), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_gbdt_predict_before_fit() {
        let model = GBDTRegressor::new(small_params());
        let x = Array2::from_shape_vec((1, 2), vec![0.0, 1.0]).unwrap();
        assert!(matches!(model.predict(&x), Err(ModelError::NotFitted)));
    }
}
