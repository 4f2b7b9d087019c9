use glucast_models::config::{KernelType, ModelConfig, ModelType, ScalerKind, StackingConfig};

#[test]
fn model_config_round_trips_through_json() {
    let configs = vec![
        ModelConfig::new("enet".parse().unwrap()).with_scaler(ScalerKind::Robust),
        ModelConfig::new("krr".parse().unwrap()),
        ModelConfig::default(),
    ];
    for cfg in configs {
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}

#[test]
fn scaler_defaults_to_none_when_omitted() {
    let json = r#"{"Lasso": {"alpha": 0.0005, "max_iter": 1000, "tol": 0.0001}}"#;
    let cfg: ModelConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.scaler, ScalerKind::None);
    assert_eq!(cfg.model_type.name(), "lasso");
}

#[test]
fn kernel_ridge_json_uses_lowercase_kernel() {
    let json = r#"{
        "scaler": "standard",
        "KernelRidge": {"alpha": 0.6, "kernel": "polynomial", "degree": 2, "coef0": 2.5, "gamma": null}
    }"#;
    let cfg: ModelConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.scaler, ScalerKind::Standard);
    match cfg.model_type {
        ModelType::KernelRidge { kernel, degree, .. } => {
            assert_eq!(kernel, KernelType::Polynomial);
            assert_eq!(degree, 2);
        }
        other => panic!("unexpected model type {}", other),
    }
}

#[test]
fn stacking_config_fills_missing_fields() {
    let cfg: StackingConfig = serde_json::from_str(r#"{"n_folds": 3}"#).unwrap();
    assert_eq!(cfg.n_folds, 3);
    assert!(cfg.shuffle);
    assert_eq!(cfg.seed, Some(156));
    assert!(!cfg.parallel);
}
