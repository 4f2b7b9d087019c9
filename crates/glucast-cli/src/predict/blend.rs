//! Weighted blending of per-model predictions and the post-blend overrides.
use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use glucast_models::math::Array1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendWeight {
    pub model: String,
    pub weight: f64,
}

/// Replace the blended value with `model`'s prediction wherever that
/// prediction exceeds `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    pub model: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub weights: Vec<BlendWeight>,
    pub threshold_override: Option<ThresholdOverride>,
    /// Final values for specific identifiers, applied last.
    pub fixed_overrides: BTreeMap<String, f64>,
}

impl Default for BlendConfig {
    fn default() -> Self {
        let weight = |model: &str, weight: f64| BlendWeight {
            model: model.to_string(),
            weight,
        };
        BlendConfig {
            weights: vec![
                weight("stack", 0.8),
                weight("gbdt_xgb", 0.05),
                weight("gbdt_lgb", 0.15),
            ],
            threshold_override: Some(ThresholdOverride {
                model: "gbdt_xgb".to_string(),
                threshold: 8.0,
            }),
            fixed_overrides: BTreeMap::new(),
        }
    }
}

/// How many rows each override touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideCounts {
    pub threshold: usize,
    pub fixed: usize,
}

impl BlendConfig {
    /// Check that every referenced model is one of `model_names`.
    pub fn validate(&self, model_names: &[String]) -> Result<()> {
        if self.weights.is_empty() {
            bail!("blend.weights must not be empty");
        }
        for w in &self.weights {
            if !model_names.contains(&w.model) {
                bail!("Blend weight refers to unknown model '{}'", w.model);
            }
            if !w.weight.is_finite() {
                bail!("Blend weight for '{}' is not finite", w.model);
            }
        }
        if let Some(t) = &self.threshold_override {
            if !model_names.contains(&t.model) {
                bail!("Threshold override refers to unknown model '{}'", t.model);
            }
        }
        let total: f64 = self.weights.iter().map(|w| w.weight).sum();
        if (total - 1.0).abs() > 1e-6 {
            log::warn!("Blend weights sum to {:.4}, not 1", total);
        }
        Ok(())
    }

    /// Weighted sum of the named prediction vectors.
    pub fn blend(&self, predictions: &BTreeMap<String, Array1<f64>>) -> Result<Array1<f64>> {
        let first = self
            .weights
            .first()
            .ok_or_else(|| anyhow!("blend.weights must not be empty"))?;
        let n = lookup(predictions, &first.model)?.len();

        let mut out = Array1::<f64>::zeros(n);
        for w in &self.weights {
            let preds = lookup(predictions, &w.model)?;
            if preds.len() != n {
                bail!(
                    "Model '{}' has {} predictions, expected {}",
                    w.model,
                    preds.len(),
                    n
                );
            }
            out = out.add(&preds.mapv(|p| p * w.weight));
        }
        Ok(out)
    }

    /// Apply the threshold override and then the fixed per-id overrides.
    pub fn apply_overrides(
        &self,
        ids: &[String],
        blended: &Array1<f64>,
        predictions: &BTreeMap<String, Array1<f64>>,
    ) -> Result<(Array1<f64>, OverrideCounts)> {
        if ids.len() != blended.len() {
            bail!("{} ids for {} blended predictions", ids.len(), blended.len());
        }
        let mut out = blended.clone();
        let mut counts = OverrideCounts::default();

        if let Some(t) = &self.threshold_override {
            let source = lookup(predictions, &t.model)?;
            for (value, &candidate) in out.iter_mut().zip(source.iter()) {
                if candidate > t.threshold {
                    *value = candidate;
                    counts.threshold += 1;
                }
            }
        }

        for (id, &value) in &self.fixed_overrides {
            match ids.iter().position(|i| i == id) {
                Some(row) => {
                    out[row] = value;
                    counts.fixed += 1;
                }
                None => log::warn!("Override id '{}' not found in test data", id),
            }
        }
        Ok((out, counts))
    }
}

fn lookup<'a>(
    predictions: &'a BTreeMap<String, Array1<f64>>,
    model: &str,
) -> Result<&'a Array1<f64>> {
    predictions
        .get(model)
        .ok_or_else(|| anyhow!("No predictions for model '{}'", model))
}
