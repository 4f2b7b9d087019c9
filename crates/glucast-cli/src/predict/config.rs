use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use glucast_models::config::{KernelType, ModelConfig, ModelType, ScalerKind, StackingConfig};
use glucast_models::io::TableSchema;

use crate::predict::blend::BlendConfig;
use crate::predict::util::validate_tsv_or_csv_file;

/// Base models, meta-model and fold settings of the stacked ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingSetup {
    pub base_models: Vec<ModelConfig>,
    pub meta_model: ModelConfig,
    #[serde(flatten)]
    pub config: StackingConfig,
}

impl Default for StackingSetup {
    fn default() -> Self {
        let enet = ModelConfig::new(ModelType::ElasticNet {
            alpha: 0.0005,
            l1_ratio: 0.9,
            max_iter: 1000,
            tol: 1e-4,
        })
        .with_scaler(ScalerKind::Robust);
        let gboost = ModelConfig::new(ModelType::GBDT {
            learning_rate: 0.05,
            max_depth: 4,
            num_boost_round: 3000,
            min_leaf_size: 15,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 0.2,
            debug: false,
            training_optimization_level: 2,
            loss_type: "SquaredError".to_string(),
        });
        let krr = ModelConfig::new(ModelType::KernelRidge {
            alpha: 0.6,
            kernel: KernelType::Polynomial,
            degree: 2,
            coef0: 2.5,
            gamma: None,
        });
        let lasso = ModelConfig::new(ModelType::Lasso {
            alpha: 0.0005,
            max_iter: 1000,
            tol: 1e-4,
        })
        .with_scaler(ScalerKind::Robust);

        StackingSetup {
            base_models: vec![enet, gboost, krr],
            meta_model: lasso,
            config: StackingConfig::default(),
        }
    }
}

/// A model fitted on its own, outside the stacked ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedModel {
    pub name: String,
    pub model: ModelConfig,
}

fn default_standalone_models() -> Vec<NamedModel> {
    vec![
        NamedModel {
            name: "gbdt_xgb".to_string(),
            model: ModelConfig::new(ModelType::GBDT {
                learning_rate: 0.05,
                max_depth: 4,
                num_boost_round: 2200,
                min_leaf_size: 100,
                data_sample_ratio: 0.8,
                feature_sample_ratio: 0.8,
                debug: false,
                training_optimization_level: 2,
                loss_type: "SquaredError".to_string(),
            }),
        },
        NamedModel {
            name: "gbdt_lgb".to_string(),
            model: ModelConfig::new(ModelType::GBDT {
                learning_rate: 0.05,
                max_depth: 3,
                num_boost_round: 720,
                min_leaf_size: 6,
                data_sample_ratio: 0.8,
                feature_sample_ratio: 0.2319,
                debug: false,
                training_optimization_level: 2,
                loss_type: "SquaredError".to_string(),
            }),
        },
    ]
}

/// Everything a `glucast predict` or `glucast cv` run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    pub train_data: String,
    pub test_data: String,
    /// Submission path; `predict_<YYYYmmdd_HHMMSS>.csv` when unset.
    pub output_file: Option<String>,
    /// Optional HTML report path.
    pub report_file: Option<String>,
    pub schema: TableSchema,
    /// Sparse columns removed from both tables before anything else.
    pub drop_columns: Vec<String>,
    /// Fit on `ln(1 + y)` and map predictions back with `exp(p) - 1`.
    pub log_target: bool,
    /// Box-Cox only columns with `|skew|` above this; `null` transforms every
    /// column, as the reference run did.
    pub skew_threshold: Option<f64>,
    pub boxcox_lambda: f64,
    pub stacking: StackingSetup,
    pub standalone_models: Vec<NamedModel>,
    pub blend: BlendConfig,
    pub cv_folds: usize,
    pub cv_seed: Option<u64>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        PredictConfig {
            train_data: String::new(),
            test_data: String::new(),
            output_file: None,
            report_file: None,
            schema: TableSchema::default(),
            drop_columns: [
                "乙肝表面抗原",
                "乙肝表面抗体",
                "乙肝e抗原",
                "乙肝e抗体",
                "乙肝核心抗体",
                "红细胞体积分布宽度",
                "嗜酸细胞%",
                "嗜碱细胞%",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            log_target: true,
            skew_threshold: Some(0.75),
            boxcox_lambda: 0.15,
            stacking: StackingSetup::default(),
            standalone_models: default_standalone_models(),
            blend: BlendConfig::default(),
            cv_folds: 5,
            cv_seed: Some(42),
        }
    }
}

/// Load a predict configuration from a JSON file.
pub fn load_predict_config(path: &PathBuf) -> Result<PredictConfig> {
    let config_json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: PredictConfig = serde_json::from_str(&config_json)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Value of an optional string argument; `None` when the subcommand does not
/// define it.
fn override_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

impl PredictConfig {
    /// Load `config_path` and apply the command line overrides in `matches`.
    pub fn from_arguments(config_path: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let mut config = load_predict_config(config_path)?;

        if let Some(train_data) = override_arg(matches, "train_data") {
            config.train_data = train_data;
        }
        if let Some(test_data) = override_arg(matches, "test_data") {
            config.test_data = test_data;
        }
        if let Some(output_file) = override_arg(matches, "output_file") {
            config.output_file = Some(output_file);
        }
        if let Some(report_file) = override_arg(matches, "report_file") {
            config.report_file = Some(report_file);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_tsv_or_csv_file(&self.train_data).context("Invalid train_data")?;
        validate_tsv_or_csv_file(&self.test_data).context("Invalid test_data")?;
        if self.stacking.base_models.is_empty() {
            anyhow::bail!("stacking.base_models must not be empty");
        }
        if self.stacking.config.n_folds < 2 {
            anyhow::bail!("stacking.n_folds must be at least 2");
        }
        let names = self.model_names();
        let mut seen = BTreeSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                anyhow::bail!(
                    "Model name '{}' is used more than once ('{}' is reserved for the stacked ensemble)",
                    name,
                    crate::predict::pipeline::STACK_NAME
                );
            }
        }
        self.blend.validate(&names)?;
        Ok(())
    }

    /// Names of every prediction column the pipeline produces, in order.
    pub fn model_names(&self) -> Vec<String> {
        std::iter::once(crate::predict::pipeline::STACK_NAME.to_string())
            .chain(self.standalone_models.iter().map(|m| m.name.clone()))
            .collect()
    }
}
