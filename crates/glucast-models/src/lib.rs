//! glucast-models: regression models and ensembles for tabular clinical data.
//!
//! This crate provides the `Regressor` trait with linear (lasso / elastic net),
//! kernel ridge and gradient-boosted tree implementations, a k-fold stacking
//! ensemble and an averaging ensemble built on that trait, plus the
//! preprocessing, CSV io, metrics and HTML reporting helpers used by the
//! `glucast` pipeline.
//!
//! Every model consumes the crate's own `Array2<f64>` / `Array1<f64>` types
//! and reports failures through [`error::ModelError`].
pub mod config;
pub mod ensemble;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod stats;
pub mod validation;
