//! Candidate regression estimators for the imputation step.
use crate::error::{Error, Result};
use crate::prelude::Real;
use nalgebra::{DMatrix, DVector};
use rand::prelude::*;

pub trait Regressor {
    fn name(&self) -> &'static str;
    fn fit(&mut self, x: &DMatrix<Real>, y: &DVector<Real>) -> Result<()>;
    fn predict(&self, x: &DMatrix<Real>) -> DVector<Real>;
}

fn singular(name: &str) -> Error {
    Error::Regression(format!("{}: singular design matrix", name))
}

/// Ordinary least squares with an intercept, solved by SVD.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coef: DVector<Real>,
    intercept: Real,
}

impl LinearRegression {
    pub fn new() -> Self {
        LinearRegression {
            coef: DVector::zeros(0),
            intercept: 0.0,
        }
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &'static str {
        "LinearRegression"
    }

    fn fit(&mut self, x: &DMatrix<Real>, y: &DVector<Real>) -> Result<()> {
        let n = x.nrows();
        let design = x.clone().insert_column(0, 1.0);
        if n == 0 {
            return Err(singular(self.name()));
        }
        let svd = design.svd(true, true);
        let solution = svd
            .solve(y, 1e-12)
            .map_err(|e| Error::Regression(format!("{}: {}", self.name(), e)))?;
        self.intercept = solution[0];
        self.coef = DVector::from_iterator(x.ncols(), solution.iter().skip(1).copied());
        Ok(())
    }

    fn predict(&self, x: &DMatrix<Real>) -> DVector<Real> {
        x * &self.coef + DVector::from_element(x.nrows(), self.intercept)
    }
}

/// Bayesian ridge regression, fit by evidence maximization with weak
/// Gamma(1e-6, 1e-6) hyperpriors on both precisions. Features and target are
/// centered, so the intercept falls out of the posterior mean.
#[derive(Debug, Clone)]
pub struct BayesianRidge {
    pub max_iter: usize,
    pub tol: Real,
    coef: DVector<Real>,
    intercept: Real,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        BayesianRidge {
            max_iter: 300,
            tol: 1e-6,
            coef: DVector::zeros(0),
            intercept: 0.0,
        }
    }
}

impl BayesianRidge {
    pub fn new() -> Self {
        Self::default()
    }
}

const HYPER: Real = 1e-6;

impl Regressor for BayesianRidge {
    fn name(&self) -> &'static str {
        "BayesianRidge"
    }

    fn fit(&mut self, x: &DMatrix<Real>, y: &DVector<Real>) -> Result<()> {
        let n = x.nrows();
        let p = x.ncols();
        if n < 2 {
            return Err(singular(self.name()));
        }

        let x_mean = x.row_mean();
        let y_mean = y.mean();
        let xc = DMatrix::from_fn(n, p, |i, j| x[(i, j)] - x_mean[j]);
        let yc = y.map(|v| v - y_mean);

        let xtx = xc.transpose() * &xc;
        let xty = xc.transpose() * &yc;

        let var_y = yc.norm_squared() / n as Real;
        let mut alpha = 1.0 / (var_y + 1e-7);
        let mut lambda = 1.0;
        let mut coef = DVector::<Real>::zeros(p);

        for _ in 0..self.max_iter {
            let a = DMatrix::identity(p, p) * lambda + &xtx * alpha;
            let chol = a.cholesky().ok_or_else(|| singular(self.name()))?;
            let sigma = chol.inverse();
            let mu = &sigma * (&xty * alpha);

            let residual = &yc - &xc * &mu;
            let rss = residual.norm_squared();
            let gamma = p as Real - lambda * sigma.trace();
            lambda = (gamma + 2.0 * HYPER) / (mu.norm_squared() + 2.0 * HYPER);
            alpha = ((n as Real - gamma) + 2.0 * HYPER) / (rss + 2.0 * HYPER);

            let delta = (&mu - &coef).amax();
            coef = mu;
            if delta < self.tol {
                break;
            }
        }

        self.intercept = y_mean - x_mean.transpose().dot(&coef);
        self.coef = coef;
        Ok(())
    }

    fn predict(&self, x: &DMatrix<Real>) -> DVector<Real> {
        x * &self.coef + DVector::from_element(x.nrows(), self.intercept)
    }
}

/// Bootstrap-aggregated variance-reduction regression trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegression {
    pub n_trees: usize,
    pub min_leaf: usize,
    pub seed: u64,
    trees: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Real),
    Split {
        feature: usize,
        threshold: Real,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Default for RandomForestRegression {
    fn default() -> Self {
        RandomForestRegression {
            n_trees: 100,
            min_leaf: 2,
            seed: 0,
            trees: Vec::new(),
        }
    }
}

impl RandomForestRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        RandomForestRegression {
            seed,
            ..Self::default()
        }
    }

    fn grow(&self, x: &DMatrix<Real>, y: &DVector<Real>, indices: &[usize]) -> Node {
        let mean = indices.iter().map(|&i| y[i]).sum::<Real>() / indices.len() as Real;
        if indices.len() < 2 * self.min_leaf {
            return Node::Leaf(mean);
        }

        let mut best: Option<(usize, Real, Real)> = None;
        let parent_sse = sse(y, indices, mean);
        if parent_sse <= 0.0 {
            return Node::Leaf(mean);
        }

        for feature in 0..x.ncols() {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| {
                x[(a, feature)]
                    .partial_cmp(&x[(b, feature)])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let total: Real = order.iter().map(|&i| y[i]).sum();
            let mut left_sum = 0.0;
            for split in self.min_leaf..=(order.len() - self.min_leaf) {
                left_sum += y[order[split - 1]];
                // Skip splits between equal feature values.
                if split < order.len()
                    && x[(order[split - 1], feature)] == x[(order[split], feature)]
                {
                    continue;
                }
                let right_sum = total - left_sum;
                let nl = split as Real;
                let nr = (order.len() - split) as Real;
                // Maximizing sum of squared side-means times counts is
                // equivalent to minimizing the split SSE.
                let score = left_sum * left_sum / nl + right_sum * right_sum / nr;
                if best.map(|(_, _, s)| score > s).unwrap_or(true) {
                    let threshold =
                        0.5 * (x[(order[split - 1], feature)] + x[(order[split], feature)]);
                    best = Some((feature, threshold, score));
                }
            }
        }

        match best {
            None => Node::Leaf(mean),
            Some((feature, threshold, _)) => {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[(i, feature)] <= threshold);
                if left.is_empty() || right.is_empty() {
                    return Node::Leaf(mean);
                }
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.grow(x, y, &left)),
                    right: Box::new(self.grow(x, y, &right)),
                }
            }
        }
    }
}

fn sse(y: &DVector<Real>, indices: &[usize], mean: Real) -> Real {
    indices.iter().map(|&i| (y[i] - mean) * (y[i] - mean)).sum()
}

fn predict_tree(node: &Node, row: &[Real]) -> Real {
    match node {
        Node::Leaf(value) => *value,
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                predict_tree(left, row)
            } else {
                predict_tree(right, row)
            }
        }
    }
}

impl Regressor for RandomForestRegression {
    fn name(&self) -> &'static str {
        "RandomForestRegression"
    }

    fn fit(&mut self, x: &DMatrix<Real>, y: &DVector<Real>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(singular(self.name()));
        }
        let mut rng = SmallRng::seed_from_u64(self.seed);
        self.trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                self.grow(x, y, &sample)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &DMatrix<Real>) -> DVector<Real> {
        DVector::from_iterator(
            x.nrows(),
            (0..x.nrows()).map(|i| {
                let row: Vec<Real> = x.row(i).iter().copied().collect();
                self.trees.iter().map(|t| predict_tree(t, &row)).sum::<Real>()
                    / self.trees.len() as Real
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn linear_data() -> (DMatrix<Real>, DVector<Real>) {
        // y = 3 + 2 x0 - x1
        let rows = 40;
        let mut x = DMatrix::zeros(rows, 2);
        let mut y = DVector::zeros(rows);
        for i in 0..rows {
            let x0 = i as Real / 4.0;
            let x1 = (i % 7) as Real;
            x[(i, 0)] = x0;
            x[(i, 1)] = x1;
            y[i] = 3.0 + 2.0 * x0 - x1;
        }
        (x, y)
    }

    #[test]
    fn linear_regression_recovers_coefficients() {
        let (x, y) = linear_data();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..y.len() {
            assert_approx_eq!(pred[i], y[i], 1e-6);
        }
    }

    #[test]
    fn bayesian_ridge_fits_linear_data() {
        let (x, y) = linear_data();
        let mut model = BayesianRidge::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..y.len() {
            // Ridge shrinkage keeps this close but not exact.
            assert_approx_eq!(pred[i], y[i], 0.5);
        }
    }

    #[test]
    fn random_forest_interpolates_training_data() {
        let (x, y) = linear_data();
        let mut model = RandomForestRegression::seeded(3);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        let y_mean = y.mean();
        let ss_res: Real = (0..y.len()).map(|i| (pred[i] - y[i]).powi(2)).sum();
        let ss_tot: Real = (0..y.len()).map(|i| (y[i] - y_mean).powi(2)).sum();
        assert!(1.0 - ss_res / ss_tot > 0.8);
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let (x, y) = linear_data();
        let mut a = RandomForestRegression::seeded(9);
        let mut b = RandomForestRegression::seeded(9);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let pa = a.predict(&x);
        let pb = b.predict(&x);
        for i in 0..pa.len() {
            assert_eq!(pa[i], pb[i]);
        }
    }
}
