use crate::ensemble::folds::KFold;
use crate::error::{check_fit_input, ModelError, Result};
use crate::math::{Array1, Array2};
use crate::models::Regressor;
use crate::stats::rmse;

/// K-fold cross-validated RMSE of `template`.
///
/// Each fold fits a fresh clone on the other folds and scores it on the
/// held-out rows. Returns one RMSE per fold, in fold order.
pub fn cross_val_rmse(
    template: &dyn Regressor,
    x: &Array2<f64>,
    y: &Array1<f64>,
    n_folds: usize,
    seed: Option<u64>,
) -> Result<Vec<f64>> {
    check_fit_input(x, y)?;
    let folds = KFold::new(n_folds).shuffle(true).seed(seed).split(x.nrows())?;

    let mut scores = Vec::with_capacity(folds.len());
    for split in &folds {
        let stage = || format!("{} on fold {}", template.name(), split.fold_idx);
        let mut model = template.fresh();
        model
            .fit(
                &x.select_rows(&split.train_indices),
                &y.select(&split.train_indices),
            )
            .map_err(|e| ModelError::upstream(stage(), e))?;
        let predicted = model
            .predict(&x.select_rows(&split.test_indices))
            .map_err(|e| ModelError::upstream(stage(), e))?;
        let observed = y.select(&split.test_indices);
        let score = rmse(&predicted, &observed).ok_or_else(|| {
            ModelError::upstream(stage(), ModelError::invalid("prediction length mismatch"))
        })?;
        log::debug!("cv: {} fold {} rmse {:.5}", template.name(), split.fold_idx, score);
        scores.push(score);
    }
    Ok(scores)
}
