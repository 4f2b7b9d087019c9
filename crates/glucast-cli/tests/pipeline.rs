//! End-to-end runs of the prediction pipeline on small synthetic tables.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use glucast_cli::predict::blend::{BlendConfig, BlendWeight};
use glucast_cli::predict::config::{NamedModel, PredictConfig, StackingSetup};
use glucast_cli::predict::pipeline::{prepare_data, run_cv, run_pipeline, STACK_NAME};
use glucast_models::config::{ModelConfig, ModelType, ScalerKind, StackingConfig};
use glucast_models::preprocessing::boxcox1p;

const FEATURES: &str = "性别,年龄,体检日期,甘油三酯,尿酸,乙肝表面抗原";

fn fast_gbdt(rounds: u32) -> ModelConfig {
    ModelConfig::new(ModelType::GBDT {
        learning_rate: 0.1,
        max_depth: 3,
        num_boost_round: rounds,
        min_leaf_size: 2,
        data_sample_ratio: 1.0,
        feature_sample_ratio: 1.0,
        debug: false,
        training_optimization_level: 2,
        loss_type: "SquaredError".to_string(),
    })
}

/// One table row; `i` drives every feature value.
fn row(id: &str, i: usize, with_target: bool) -> String {
    let sex = if i % 2 == 0 { "男" } else { "女" };
    let age = 25 + (i * 7) % 45;
    let day = 10 + i % 18;
    // right-skewed lab value
    let k = ((i * 13) % 17) as f64;
    let tg = 0.5 + k * k / 40.0;
    let ua = if i % 11 == 4 {
        String::new()
    } else {
        format!("{:.1}", 250.0 + ((i * 31) % 150) as f64)
    };
    // sparse column, removed before fitting
    let hbsag = if i % 9 == 0 { "0.01" } else { "" };
    let mut line = format!(
        "{},{},{},2017-10-{:02},{:.3},{},{}",
        id, sex, age, day, tg, ua, hbsag
    );
    if with_target {
        let glucose = 4.2 + 0.04 * age as f64 + 0.3 * tg.ln_1p();
        write!(line, ",{:.3}", glucose).unwrap();
    }
    line
}

fn write_tables(dir: &Path, n_train: usize, n_test: usize) -> (String, String) {
    let train_path = dir.join("train.csv");
    let test_path = dir.join("test.csv");

    let mut train = format!("id,{},血糖", FEATURES);
    for i in 0..n_train {
        train.push('\n');
        train.push_str(&row(&format!("r{}", i), i, true));
    }
    let mut test = format!("id,{}", FEATURES);
    for i in 0..n_test {
        test.push('\n');
        test.push_str(&row(&format!("t{}", i), i * 5 + 3, false));
    }
    std::fs::write(&train_path, train).unwrap();
    std::fs::write(&test_path, test).unwrap();
    (
        train_path.to_string_lossy().to_string(),
        test_path.to_string_lossy().to_string(),
    )
}

fn small_config(dir: &Path) -> PredictConfig {
    let (train_data, test_data) = write_tables(dir, 40, 8);
    let mut fixed_overrides = BTreeMap::new();
    fixed_overrides.insert("t3".to_string(), 11.945);

    PredictConfig {
        train_data,
        test_data,
        output_file: Some(dir.join("submission.csv").to_string_lossy().to_string()),
        report_file: Some(dir.join("report.html").to_string_lossy().to_string()),
        drop_columns: vec!["乙肝表面抗原".to_string()],
        stacking: StackingSetup {
            base_models: vec![
                ModelConfig::new("enet".parse().unwrap()).with_scaler(ScalerKind::Robust),
                fast_gbdt(30),
                ModelConfig::new("krr".parse().unwrap()).with_scaler(ScalerKind::Standard),
            ],
            meta_model: ModelConfig::new("lasso".parse().unwrap()),
            config: StackingConfig {
                n_folds: 3,
                ..StackingConfig::default()
            },
        },
        standalone_models: vec![NamedModel {
            name: "gbdt_small".to_string(),
            model: fast_gbdt(20),
        }],
        blend: BlendConfig {
            weights: vec![
                BlendWeight {
                    model: STACK_NAME.to_string(),
                    weight: 0.7,
                },
                BlendWeight {
                    model: "gbdt_small".to_string(),
                    weight: 0.3,
                },
            ],
            threshold_override: None,
            fixed_overrides,
        },
        cv_folds: 3,
        ..PredictConfig::default()
    }
}

#[test]
fn prepare_data_aligns_and_imputes() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let data = prepare_data(&config).unwrap();

    assert_eq!(data.x_train.shape(), (40, 5));
    assert_eq!(data.x_test.shape(), (8, 5));
    assert_eq!(data.feature_names, vec!["性别", "年龄", "体检日期", "甘油三酯", "尿酸"]);
    assert!(data.x_train.all_finite());
    assert!(data.x_test.all_finite());
    assert_eq!(data.train_ids[0], "r0");
    assert_eq!(data.test_ids[7], "t7");
    // log1p target
    assert!(data.y_train.iter().all(|&v| v > 1.5 && v < 2.5));
}

#[test]
fn skew_threshold_none_transforms_symmetric_columns_too() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    // ages are spread evenly, so the threshold leaves them alone
    let thresholded = prepare_data(&config).unwrap();
    assert_eq!(thresholded.x_train[(0, 1)], 25.0);

    let all = prepare_data(&PredictConfig {
        skew_threshold: None,
        ..config
    })
    .unwrap();
    assert!((all.x_train[(0, 1)] - boxcox1p(25.0, 0.15)).abs() < 1e-12);
}

#[test]
fn run_pipeline_writes_submission_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let output = run_pipeline(&config).unwrap();

    assert_eq!(output.ids.len(), 8);
    assert_eq!(output.submit.len(), 8);
    assert!(output.predictions.contains_key(STACK_NAME));
    assert!(output.predictions.contains_key("gbdt_small"));
    assert!(output.train_msle.contains_key("blend"));
    assert!(output.train_msle.values().all(|v| v.is_finite() && *v >= 0.0));

    // blended values stay on the raw glucose scale
    for (i, &v) in output.blended.iter().enumerate() {
        assert!(v > 3.0 && v < 12.0, "row {}: {}", i, v);
    }
    for i in 0..8 {
        if i == 3 {
            assert_eq!(output.submit[i], 11.945);
        } else {
            assert_eq!(output.submit[i], output.blended[i]);
        }
    }

    let written = std::fs::read_to_string(&output.output_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next().unwrap(), "Id,Submit,Predict,stack,gbdt_small");
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 8);
    assert!(rows[3].starts_with("t3,11.945,"));

    let report = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(report.contains("Training fit"));
    assert!(report.contains("gbdt_small"));
}

#[test]
fn run_cv_scores_every_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let results = run_cv(&config).unwrap();

    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec![STACK_NAME, "gbdt_small"]);
    for (name, scores) in &results {
        assert_eq!(scores.len(), 3, "{}", name);
        assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0), "{}", name);
    }
}

#[test]
fn mismatched_test_columns_fail() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(dir.path());
    let test_path = dir.path().join("narrow.csv");
    std::fs::write(&test_path, "id,性别,年龄\nt0,男,40\n").unwrap();
    config.test_data = test_path.to_string_lossy().to_string();

    assert!(run_pipeline(&config).is_err());
}

#[test]
fn cli_predict_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    let out_path = dir.path().join("cli_out.csv");

    Command::cargo_bin("glucast")
        .unwrap()
        .arg("predict")
        .arg(&config_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written.lines().count(), 9);
}

#[test]
fn cli_cv_prints_scores() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    Command::cargo_bin("glucast")
        .unwrap()
        .arg("cv")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("stack\t"))
        .stdout(predicate::str::contains("gbdt_small\t"));
}
