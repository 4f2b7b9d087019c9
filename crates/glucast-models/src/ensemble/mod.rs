//! Ensembles built on the `Regressor` trait.
//!
//! Both ensembles are regressors themselves and can be nested.

pub mod averaging;
pub mod folds;
pub mod stacking;

pub use averaging::AveragingEnsemble;
pub use folds::{FoldSplit, KFold};
pub use stacking::StackingEnsemble;
