//! End-to-end prediction run: load, clean, fit, blend, write.
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use maud::html;

use glucast_models::ensemble::StackingEnsemble;
use glucast_models::io::{read_table, write_submission};
use glucast_models::math::{Array1, Array2};
use glucast_models::models::factory::build_model;
use glucast_models::models::Regressor;
use glucast_models::preprocessing::{correct_skew, impute_median, nan_median};
use glucast_models::report::plots::{plot_histogram, plot_pp};
use glucast_models::report::{Report, ReportSection};
use glucast_models::stats::{msle, r2};
use glucast_models::validation::cross_val_rmse;

use crate::predict::config::PredictConfig;
use crate::predict::util::timestamped_output_path;

/// Prediction column name of the stacked ensemble.
pub const STACK_NAME: &str = "stack";

/// Model-ready matrices after cleaning and feature transforms.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train_ids: Vec<String>,
    pub test_ids: Vec<String>,
    pub feature_names: Vec<String>,
    pub x_train: Array2<f64>,
    /// Target in model space (`log1p` applied when configured).
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
}

/// Result of a full `predict` run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output_path: PathBuf,
    pub ids: Vec<String>,
    /// Blend after overrides, as written to the `Submit` column.
    pub submit: Array1<f64>,
    /// Blend before overrides.
    pub blended: Array1<f64>,
    /// Raw-scale test predictions per model.
    pub predictions: BTreeMap<String, Array1<f64>>,
    /// Raw-scale training MSLE per model and for the blend (`"blend"`).
    pub train_msle: BTreeMap<String, f64>,
}

/// Read both tables and turn them into model-ready matrices.
pub fn prepare_data(config: &PredictConfig) -> Result<PreparedData> {
    let schema = &config.schema;
    let mut train = read_table(&config.train_data, schema, true)
        .with_context(|| format!("Failed to load training data {}", config.train_data))?;
    let mut test = read_table(&config.test_data, schema, false)
        .with_context(|| format!("Failed to load test data {}", config.test_data))?;

    let dropped = train.drop_columns(&config.drop_columns);
    test.drop_columns(&config.drop_columns);
    log::info!("Dropped {} sparse columns", dropped.len());
    let test = test.align_to(&train.feature_names)?;

    // Each table is imputed with its own medians.
    impute_median(&mut train.x);
    let mut x_test = test.x;
    impute_median(&mut x_test);

    let mut y = train
        .target
        .ok_or_else(|| anyhow!("Training data has no target column"))?;
    let missing = y.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        let fill = nan_median(y.as_slice())
            .ok_or_else(|| anyhow!("Target column has no observed values"))?;
        log::warn!("Filling {} missing target values with the median {}", missing, fill);
        y = y.mapv(|&v| if v.is_nan() { fill } else { v });
    }
    if config.log_target {
        y = y.mapv(|v| v.ln_1p());
    }

    // Skew is measured over train and test together so both get the same
    // column transforms.
    let n_train = train.x.nrows();
    let mut all = train
        .x
        .concat_rows(&x_test)
        .map_err(|e| anyhow!("Train and test widths differ: {}", e))?;
    let transformed = correct_skew(&mut all, config.skew_threshold, config.boxcox_lambda);
    log::info!(
        "Box-Cox transformed {} features (lambda {})",
        transformed.len(),
        config.boxcox_lambda
    );
    let train_rows: Vec<usize> = (0..n_train).collect();
    let test_rows: Vec<usize> = (n_train..all.nrows()).collect();

    log::trace!("train {:?}, test {:?}", (n_train, all.ncols()), (test_rows.len(), all.ncols()));
    Ok(PreparedData {
        train_ids: train.ids,
        test_ids: test.ids,
        feature_names: train.feature_names,
        x_train: all.select_rows(&train_rows),
        y_train: y,
        x_test: all.select_rows(&test_rows),
    })
}

/// The stacked ensemble followed by the standalone models, all unfit.
pub fn build_models(config: &PredictConfig) -> Result<Vec<(String, Box<dyn Regressor>)>> {
    let stacking: Box<dyn Regressor> = Box::new(StackingEnsemble::from_configs(
        &config.stacking.base_models,
        &config.stacking.meta_model,
        config.stacking.config.clone(),
    )?);
    let mut models = vec![(STACK_NAME.to_string(), stacking)];
    for named in &config.standalone_models {
        models.push((named.name.clone(), build_model(&named.model)));
    }
    Ok(models)
}

fn to_raw(config: &PredictConfig, values: &Array1<f64>) -> Array1<f64> {
    if config.log_target {
        values.mapv(|v| v.exp_m1())
    } else {
        values.clone()
    }
}

fn score(predicted: &Array1<f64>, observed: &Array1<f64>) -> f64 {
    msle(predicted, observed).unwrap_or(f64::NAN)
}

/// Run the full pipeline and write the submission (and report, if configured).
pub fn run_pipeline(config: &PredictConfig) -> Result<PipelineOutput> {
    let data = prepare_data(config)?;
    log::info!(
        "Training on {} rows x {} features; predicting {} rows",
        data.x_train.nrows(),
        data.x_train.ncols(),
        data.x_test.nrows()
    );
    let y_raw = to_raw(config, &data.y_train);

    let mut train_preds = BTreeMap::new();
    let mut test_preds = BTreeMap::new();
    let mut train_msle = BTreeMap::new();
    let mut column_order = Vec::new();

    for (name, mut model) in build_models(config)? {
        log::info!("Fitting {} ({})", name, model.name());
        model
            .fit(&data.x_train, &data.y_train)
            .with_context(|| format!("Fitting {} failed", name))?;

        let fitted = model
            .predict(&data.x_train)
            .with_context(|| format!("{} failed to predict the training data", name))?;
        let fitted_raw = to_raw(config, &fitted);
        let raw_score = score(&fitted_raw, &y_raw);
        log::info!(
            "{}: train msle {:.6} (model scale), {:.6} (raw scale)",
            name,
            score(&fitted, &data.y_train),
            raw_score
        );

        let predicted = model
            .predict(&data.x_test)
            .with_context(|| format!("{} failed to predict the test data", name))?;

        train_msle.insert(name.clone(), raw_score);
        train_preds.insert(name.clone(), fitted_raw);
        test_preds.insert(name.clone(), to_raw(config, &predicted));
        column_order.push(name);
    }

    let train_blend = config.blend.blend(&train_preds)?;
    let blend_score = score(&train_blend, &y_raw);
    log::info!(
        "Blend: train msle {:.6}, r2 {:.4} (raw scale)",
        blend_score,
        r2(&train_blend, &y_raw).unwrap_or(f64::NAN)
    );
    train_msle.insert("blend".to_string(), blend_score);

    let blended = config.blend.blend(&test_preds)?;
    let (submit, counts) = config
        .blend
        .apply_overrides(&data.test_ids, &blended, &test_preds)?;
    log::info!(
        "Overrides applied: {} by threshold, {} fixed",
        counts.threshold,
        counts.fixed
    );

    let output_path = config
        .output_file
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(timestamped_output_path);
    let mut columns = vec![("Predict".to_string(), blended.clone())];
    for name in &column_order {
        if let Some(values) = test_preds.get(name) {
            columns.push((name.clone(), values.clone()));
        }
    }
    write_submission(&output_path, &data.test_ids, &submit, &columns)?;

    if let Some(report_file) = &config.report_file {
        let report = build_report(&y_raw, &train_blend, &train_msle);
        report.save_to_file(report_file)?;
    }

    Ok(PipelineOutput {
        output_path,
        ids: data.test_ids,
        submit,
        blended,
        predictions: test_preds,
        train_msle,
    })
}

fn build_report(
    y_raw: &Array1<f64>,
    train_blend: &Array1<f64>,
    train_msle: &BTreeMap<String, f64>,
) -> Report {
    let mut report = Report::new("glucast prediction report", env!("CARGO_PKG_VERSION"));

    let mut target_section = ReportSection::new("Training target");
    target_section.add_content(html! {
        "Distribution of the observed target on its original scale."
    });
    target_section.add_plot(plot_histogram(y_raw, "Target", "Observed target"));
    report.add_section(target_section);

    let mut fit_section = ReportSection::new("Training fit");
    fit_section.add_content(html! {
        table {
            tr { th { "Model" } th { "Train MSLE" } }
            @for (name, value) in train_msle {
                tr { td { (name) } td { (format!("{:.6}", value)) } }
            }
        }
    });
    if let Some(plot) = plot_pp(y_raw, train_blend, "Observed vs blended prediction ECDF") {
        fit_section.add_plot(plot);
    }
    report.add_section(fit_section);
    report
}

/// Cross-validated RMSE (model scale) of the stacked ensemble and every
/// standalone model. Returns `(name, per-fold scores)` in model order.
pub fn run_cv(config: &PredictConfig) -> Result<Vec<(String, Vec<f64>)>> {
    let data = prepare_data(config)?;
    let mut results = Vec::new();
    for (name, model) in build_models(config)? {
        let scores = cross_val_rmse(
            model.as_ref(),
            &data.x_train,
            &data.y_train,
            config.cv_folds,
            config.cv_seed,
        )
        .with_context(|| format!("Cross-validation of {} failed", name))?;
        let summary: Array1<f64> = scores.iter().copied().collect();
        log::info!(
            "{} score: {:.4} ({:.4})",
            name,
            summary.mean().unwrap_or(f64::NAN),
            summary.variance().map(f64::sqrt).unwrap_or(f64::NAN)
        );
        results.push((name, scores));
    }
    Ok(results)
}
