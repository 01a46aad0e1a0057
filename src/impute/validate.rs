//! K-fold cross-validation of the candidate estimators. The scores are
//! diagnostics only; estimator selection is a fixed policy.
use super::Regressor;
use crate::error::Result;
use crate::prelude::Real;
use nalgebra::{DMatrix, DVector};
use rand::prelude::*;

/// Coefficient of determination of predictions against the held-out fold.
pub fn r2_score(y_true: &DVector<Real>, y_pred: &DVector<Real>) -> Real {
    let mean = y_true.mean();
    let ss_res: Real = (0..y_true.len())
        .map(|i| (y_true[i] - y_pred[i]).powi(2))
        .sum();
    let ss_tot: Real = (0..y_true.len()).map(|i| (y_true[i] - mean).powi(2)).sum();
    if ss_tot <= Real::EPSILON {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Shuffled k-fold R² scores for a freshly built estimator per fold.
pub fn cross_val_r2<F>(
    make: F,
    x: &DMatrix<Real>,
    y: &DVector<Real>,
    k: usize,
    seed: u64,
) -> Result<Vec<Real>>
where
    F: Fn() -> Box<dyn Regressor>,
{
    let n = x.nrows();
    let k = k.min(n).max(2);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut SmallRng::seed_from_u64(seed));

    let mut scores = Vec::with_capacity(k);
    for fold in 0..k {
        let test: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(i, _)| i % k == fold)
            .map(|(_, &idx)| idx)
            .collect();
        let train: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(i, _)| i % k != fold)
            .map(|(_, &idx)| idx)
            .collect();

        let x_train = select_rows(x, &train);
        let y_train = select(y, &train);
        let x_test = select_rows(x, &test);
        let y_test = select(y, &test);

        let mut model = make();
        model.fit(&x_train, &y_train)?;
        scores.push(r2_score(&y_test, &model.predict(&x_test)));
    }
    Ok(scores)
}

pub(crate) fn select_rows(x: &DMatrix<Real>, indices: &[usize]) -> DMatrix<Real> {
    DMatrix::from_fn(indices.len(), x.ncols(), |i, j| x[(indices[i], j)])
}

pub(crate) fn select(y: &DVector<Real>, indices: &[usize]) -> DVector<Real> {
    DVector::from_iterator(indices.len(), indices.iter().map(|&i| y[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impute::LinearRegression;
    use crate::utils::mean;

    #[test]
    fn perfect_predictions_score_one() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(r2_score(&y, &y), 1.0);
    }

    #[test]
    fn folds_cover_every_row_once() {
        let n = 11;
        let x = DMatrix::from_fn(n, 1, |i, _| i as Real);
        let y = x.column(0).clone_owned();
        // A linear model generalizes perfectly from any fold split.
        let scores = cross_val_r2(|| Box::new(LinearRegression::new()), &x, &y, 4, 1).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(mean(&scores) > 0.99);
    }
}
