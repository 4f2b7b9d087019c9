use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Central configuration for models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Feature scaling fitted on the training rows before the model sees them.
    #[serde(default)]
    pub scaler: ScalerKind,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Feature scaler placed in front of a model.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScalerKind {
    #[default]
    None,
    /// Per-column mean/std standardization.
    Standard,
    /// Median centring and interquartile-range scaling.
    Robust,
}

/// Kernel used by kernel ridge regression.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KernelType {
    Linear,
    Polynomial,
    Rbf,
}

impl FromStr for KernelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(KernelType::Linear),
            "poly" | "polynomial" => Ok(KernelType::Polynomial),
            "rbf" | "gauss" => Ok(KernelType::Rbf),
            _ => Err(format!(
                "Unsupported kernel type: {}. Valid options are: linear, polynomial, rbf",
                s
            )),
        }
    }
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    Lasso {
        alpha: f64,
        max_iter: usize,
        tol: f64,
    },
    ElasticNet {
        alpha: f64,
        l1_ratio: f64,
        max_iter: usize,
        tol: f64,
    },
    KernelRidge {
        alpha: f64,
        kernel: KernelType,
        degree: i32,
        coef0: f64,
        /// Defaults to `1 / n_features` when unset.
        gamma: Option<f64>,
    },
    GBDT {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        min_leaf_size: usize,
        data_sample_ratio: f64,
        feature_sample_ratio: f64,
        debug: bool,
        training_optimization_level: u8,
        loss_type: String,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::GBDT {
            learning_rate: 0.05,
            max_depth: 4,
            num_boost_round: 300,
            min_leaf_size: 15,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 1.0,
            debug: false,
            training_optimization_level: 2,
            loss_type: "SquaredError".to_string(),
        }
    }
}

impl ModelType {
    /// Short identifier, used for logging and stage names.
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::Lasso { .. } => "lasso",
            ModelType::ElasticNet { .. } => "elastic_net",
            ModelType::KernelRidge { .. } => "kernel_ridge",
            ModelType::GBDT { .. } => "gbdt",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lasso" => Ok(ModelType::Lasso {
                alpha: 0.0005,
                max_iter: 1000,
                tol: 1e-4,
            }),
            "enet" | "elastic_net" | "elasticnet" => Ok(ModelType::ElasticNet {
                alpha: 0.0005,
                l1_ratio: 0.9,
                max_iter: 1000,
                tol: 1e-4,
            }),
            "krr" | "kernel_ridge" => Ok(ModelType::KernelRidge {
                alpha: 0.6,
                kernel: KernelType::Polynomial,
                degree: 2,
                coef0: 2.5,
                gamma: None,
            }),
            "gbdt" => Ok(ModelType::default()),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: lasso, elastic_net, kernel_ridge, gbdt",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            scaler: ScalerKind::None,
            model_type,
        }
    }

    pub fn with_scaler(mut self, scaler: ScalerKind) -> Self {
        self.scaler = scaler;
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(ModelType::default())
    }
}

/// Parameters of the k-fold stacking ensemble.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StackingConfig {
    /// Number of folds used for out-of-fold predictions (at least 2).
    pub n_folds: usize,
    /// Shuffle row indices before cutting folds.
    pub shuffle: bool,
    /// Seed of the fold shuffle; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Fit the `n_folds * n_base_models` clones on the rayon pool.
    pub parallel: bool,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            shuffle: true,
            seed: Some(156),
            parallel: false,
        }
    }
}
