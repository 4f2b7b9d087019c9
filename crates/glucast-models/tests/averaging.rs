mod common;

use common::*;
use glucast_models::ensemble::AveragingEnsemble;
use glucast_models::error::ModelError;
use glucast_models::math::{Array1, Array2};
use glucast_models::models::Regressor;

#[test]
fn averages_constant_models() {
    let (x, y) = doubling_data(6);
    let mut avg = AveragingEnsemble::new(vec![
        Box::new(ConstantRegressor::new(3.0)),
        Box::new(ConstantRegressor::new(7.0)),
    ])
    .unwrap();
    avg.fit(&x, &y).unwrap();

    let preds = avg.predict(&x).unwrap();
    assert_eq!(preds.len(), 6);
    assert!(preds.iter().all(|&p| (p - 5.0).abs() < 1e-12));
}

#[test]
fn empty_template_list_is_rejected() {
    assert!(matches!(
        AveragingEnsemble::new(vec![]),
        Err(ModelError::InvalidInput(_))
    ));
}

#[test]
fn fit_uses_fresh_clones_of_the_templates() {
    let (x, y) = doubling_data(8);
    let recorder = RecordingRegressor::new();
    let mut avg = AveragingEnsemble::new(vec![Box::new(recorder.clone())]).unwrap();
    avg.fit(&x, &y).unwrap();
    avg.predict(&x).unwrap();

    // the clone trained on every row; the template itself stays unfit
    let observations = recorder.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].trained_on, (0..8).collect::<Vec<_>>());
    assert!(matches!(recorder.predict(&x), Err(ModelError::NotFitted)));
}

#[test]
fn guards_and_error_context() {
    let (x, y) = doubling_data(5);
    let mut avg = AveragingEnsemble::new(vec![Box::new(LineRegressor::default())]).unwrap();
    assert!(matches!(avg.predict(&x), Err(ModelError::NotFitted)));

    let short_y = y.select(&[0, 1]);
    assert!(matches!(avg.fit(&x, &short_y), Err(ModelError::InvalidInput(_))));

    avg.fit(&x, &y).unwrap();
    let wide = Array2::from_shape_vec((1, 3), vec![0.0, 1.0, 2.0]).unwrap();
    assert!(matches!(avg.predict(&wide), Err(ModelError::InvalidInput(_))));

    let mut failing = AveragingEnsemble::new(vec![
        Box::new(LineRegressor::default()),
        Box::new(FailingRegressor),
    ])
    .unwrap();
    match failing.fit(&x, &y) {
        Err(ModelError::Upstream { stage, .. }) => assert!(stage.starts_with("model 1")),
        other => panic!("expected Upstream, got {:?}", other.err()),
    }
    assert!(!failing.is_fitted());
}

#[test]
fn fresh_ensemble_is_unfit() {
    let (x, y) = doubling_data(5);
    let mut avg = AveragingEnsemble::new(vec![Box::new(LineRegressor::default())]).unwrap();
    avg.fit(&x, &y).unwrap();
    let clone = avg.fresh();
    assert!(matches!(clone.predict(&x), Err(ModelError::NotFitted)));
    assert_eq!(clone.name(), "averaging");
}

#[test]
fn short_child_prediction_is_an_upstream_error() {
    let (x, y) = doubling_data(10);
    let mut avg = AveragingEnsemble::new(vec![
        Box::new(LineRegressor::default()),
        Box::new(ShortRegressor::new(1)),
    ])
    .unwrap();
    avg.fit(&x, &y).unwrap();

    match avg.predict(&x) {
        Err(ModelError::Upstream { stage, source }) => {
            assert!(stage.starts_with("model 1 (short)"), "{}", stage);
            assert!(matches!(*source, ModelError::InvalidInput(_)));
        }
        other => panic!("expected Upstream, got {:?}", other),
    }
}

#[test]
fn refit_replaces_previous_state() {
    let (x, y) = doubling_data(10);
    let mut avg = AveragingEnsemble::new(vec![
        Box::new(LineRegressor::default()),
        Box::new(LineRegressor::default()),
    ])
    .unwrap();
    avg.fit(&x, &y).unwrap();
    let query = Array2::from_shape_vec((1, 1), vec![4.0]).unwrap();
    assert!((avg.predict(&query).unwrap()[0] - 8.0).abs() < 1e-9);

    let (x2, _) = doubling_data(15);
    let y2: Array1<f64> = (0..15).map(|i| 3.0 * i as f64).collect();
    avg.fit(&x2, &y2).unwrap();

    assert!(avg.is_fitted());
    assert!((avg.predict(&query).unwrap()[0] - 12.0).abs() < 1e-9);
    assert_eq!(avg.predict(&x2).unwrap().len(), 15);

    // a failed re-fit drops the earlier fit too
    let short_y = y2.select(&[0, 1]);
    assert!(avg.fit(&x2, &short_y).is_err());
    assert!(matches!(avg.predict(&query), Err(ModelError::NotFitted)));
}
