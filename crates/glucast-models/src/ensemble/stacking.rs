//! Two-level stacking with out-of-fold base predictions.
//!
//! Every base model is refit once per fold on the rows outside that fold and
//! predicts the rows inside it. The resulting out-of-fold matrix has one
//! column per base model and is the training input of the meta-model, so the
//! meta-model never learns from a base prediction made on a row that base
//! model had seen. At prediction time each base model's fold clones are
//! averaged into a single meta-feature column.

use rayon::prelude::*;

use crate::config::{ModelConfig, StackingConfig};
use crate::ensemble::folds::{FoldSplit, KFold};
use crate::error::{
    check_fit_input, check_predict_width, check_prediction_len, ModelError, Result,
};
use crate::math::{Array1, Array2};
use crate::models::factory::build_model;
use crate::models::Regressor;

struct StackingState {
    /// `fold_models[j][f]`: base model `j` fitted without fold `f`.
    fold_models: Vec<Vec<Box<dyn Regressor>>>,
    meta: Box<dyn Regressor>,
    folds: Vec<FoldSplit>,
    oof: Array2<f64>,
    n_features: usize,
}

/// Output of one (base model, fold) job.
struct FoldJob {
    model_idx: usize,
    fold_idx: usize,
    model: Box<dyn Regressor>,
    predictions: Array1<f64>,
}

pub struct StackingEnsemble {
    base_templates: Vec<Box<dyn Regressor>>,
    meta_template: Box<dyn Regressor>,
    config: StackingConfig,
    state: Option<StackingState>,
}

impl StackingEnsemble {
    pub fn new(
        base_templates: Vec<Box<dyn Regressor>>,
        meta_template: Box<dyn Regressor>,
        config: StackingConfig,
    ) -> Result<Self> {
        if base_templates.is_empty() {
            return Err(ModelError::invalid(
                "stacking ensemble needs at least one base model",
            ));
        }
        if config.n_folds < 2 {
            return Err(ModelError::invalid(format!(
                "n_folds must be at least 2, got {}",
                config.n_folds
            )));
        }
        Ok(StackingEnsemble {
            base_templates,
            meta_template,
            config,
            state: None,
        })
    }

    pub fn from_configs(
        base: &[ModelConfig],
        meta: &ModelConfig,
        config: StackingConfig,
    ) -> Result<Self> {
        Self::new(
            base.iter().map(build_model).collect(),
            build_model(meta),
            config,
        )
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Out-of-fold predictions of the last fit (`n_samples x n_base_models`).
    pub fn out_of_fold_predictions(&self) -> Option<&Array2<f64>> {
        self.state.as_ref().map(|s| &s.oof)
    }

    /// Fold assignment used by the last fit.
    pub fn folds(&self) -> Option<&[FoldSplit]> {
        self.state.as_ref().map(|s| s.folds.as_slice())
    }

    fn stage(&self, model_idx: usize, fold_idx: usize) -> String {
        format!(
            "base model {} ({}) on fold {}",
            model_idx,
            self.base_templates[model_idx].name(),
            fold_idx
        )
    }

    fn run_job(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        model_idx: usize,
        split: &FoldSplit,
    ) -> Result<FoldJob> {
        let mut model = self.base_templates[model_idx].fresh();
        let x_train = x.select_rows(&split.train_indices);
        let y_train = y.select(&split.train_indices);
        let x_holdout = x.select_rows(&split.test_indices);

        let wrap = |e| ModelError::upstream(self.stage(model_idx, split.fold_idx), e);
        model.fit(&x_train, &y_train).map_err(wrap)?;
        let predictions = model.predict(&x_holdout).map_err(wrap)?;
        check_prediction_len(
            || self.stage(model_idx, split.fold_idx),
            &predictions,
            split.test_indices.len(),
        )?;
        log::debug!(
            "stacking: {} fitted on {} rows, predicted {} holdout rows",
            model.name(),
            split.train_indices.len(),
            split.test_indices.len()
        );
        Ok(FoldJob {
            model_idx,
            fold_idx: split.fold_idx,
            model,
            predictions,
        })
    }
}

impl Regressor for StackingEnsemble {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.state = None;
        check_fit_input(x, y)?;

        let n_samples = x.nrows();
        let n_base = self.base_templates.len();
        let folds = KFold::new(self.config.n_folds)
            .shuffle(self.config.shuffle)
            .seed(self.config.seed)
            .split(n_samples)?;
        log::trace!(
            "stacking: {} rows, {} features, {} base models, {} folds",
            n_samples,
            x.ncols(),
            n_base,
            folds.len()
        );

        let pairs: Vec<(usize, usize)> = (0..n_base)
            .flat_map(|j| (0..folds.len()).map(move |f| (j, f)))
            .collect();
        let jobs: Vec<FoldJob> = if self.config.parallel {
            pairs
                .par_iter()
                .map(|&(j, f)| self.run_job(x, y, j, &folds[f]))
                .collect::<Result<_>>()?
        } else {
            pairs
                .iter()
                .map(|&(j, f)| self.run_job(x, y, j, &folds[f]))
                .collect::<Result<_>>()?
        };

        let (oof, fold_models) = assemble_out_of_fold(jobs, &folds, n_samples, n_base)?;

        let mut meta = self.meta_template.fresh();
        meta.fit(&oof, y).map_err(|e| {
            ModelError::upstream(format!("meta model ({})", self.meta_template.name()), e)
        })?;
        log::debug!("stacking: meta model {} fitted", meta.name());

        self.state = Some(StackingState {
            fold_models,
            meta,
            folds,
            oof,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_width(x, state.n_features)?;

        let mut columns = Vec::with_capacity(state.fold_models.len());
        for (j, clones) in state.fold_models.iter().enumerate() {
            let mut sum = Array1::<f64>::zeros(x.nrows());
            for (f, model) in clones.iter().enumerate() {
                let preds = model
                    .predict(x)
                    .map_err(|e| ModelError::upstream(self.stage(j, f), e))?;
                check_prediction_len(|| self.stage(j, f), &preds, x.nrows())?;
                sum = sum.add(&preds);
            }
            let k = clones.len() as f64;
            columns.push(sum.mapv(|v| v / k));
        }
        let meta_features = Array2::from_columns(&columns)
            .map_err(|e| ModelError::invalid(format!("meta features: {}", e)))?;

        let meta_stage = || format!("meta model ({})", state.meta.name());
        let predictions = state
            .meta
            .predict(&meta_features)
            .map_err(|e| ModelError::upstream(meta_stage(), e))?;
        check_prediction_len(meta_stage, &predictions, x.nrows())?;
        Ok(predictions)
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(StackingEnsemble {
            base_templates: self.base_templates.iter().map(|t| t.fresh()).collect(),
            meta_template: self.meta_template.fresh(),
            config: self.config.clone(),
            state: None,
        })
    }

    fn name(&self) -> &str {
        "stacking"
    }
}

/// Write every job's holdout predictions into the out-of-fold matrix and group
/// the fitted clones per base model in fold order.
///
/// Each cell must be written exactly once and every (model, fold) pair must
/// have a clone; anything else means the folds do not partition the rows.
fn assemble_out_of_fold(
    jobs: Vec<FoldJob>,
    folds: &[FoldSplit],
    n_samples: usize,
    n_base: usize,
) -> Result<(Array2<f64>, Vec<Vec<Box<dyn Regressor>>>)> {
    let mut oof = Array2::zeros((n_samples, n_base));
    let mut written = vec![0usize; n_samples * n_base];
    let mut slots: Vec<Vec<Option<Box<dyn Regressor>>>> = (0..n_base)
        .map(|_| (0..folds.len()).map(|_| None).collect())
        .collect();

    for job in jobs {
        let split = folds.get(job.fold_idx).ok_or_else(|| {
            ModelError::invalid(format!("job refers to unknown fold {}", job.fold_idx))
        })?;
        for (&row, &pred) in split.test_indices.iter().zip(job.predictions.iter()) {
            if row >= n_samples {
                return Err(ModelError::invalid(format!(
                    "fold {} holds out row {} of {}",
                    split.fold_idx, row, n_samples
                )));
            }
            oof[(row, job.model_idx)] = pred;
            written[row * n_base + job.model_idx] += 1;
        }
        slots[job.model_idx][job.fold_idx] = Some(job.model);
    }

    if let Some(cell) = written.iter().position(|&c| c != 1) {
        return Err(ModelError::invalid(format!(
            "out-of-fold cell (row {}, model {}) written {} times; folds do not partition the rows",
            cell / n_base,
            cell % n_base,
            written[cell]
        )));
    }

    let mut fold_models = Vec::with_capacity(n_base);
    for (j, per_fold) in slots.into_iter().enumerate() {
        let clones = per_fold
            .into_iter()
            .enumerate()
            .map(|(f, clone)| {
                clone.ok_or_else(|| {
                    ModelError::invalid(format!("no fitted clone for base model {} on fold {}", j, f))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        fold_models.push(clones);
    }
    Ok((oof, fold_models))
}
