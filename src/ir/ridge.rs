// ============================================================
// IR — Ridge Classifier
// ============================================================
// Binary linear classifier with an l2 penalty.
//
//   targets   : true → +1, false → -1
//   objective : ||y - Xw - b||² + alpha·||w||²
//   intercept : fitted on centred data, b = ȳ - μ·w
//   predict   : x·w + b > 0
//
// X is sparse and is never densified. Centring is folded into
// the normal-equation operator:
//
//   A v = Xᵀ X v - n (μ·v) μ + alpha v
//   rhs = Xᵀ (y - ȳ)
//
// and A w = rhs is solved with conjugate gradient. With a single
// class (or no features) the rhs is zero, w stays zero and the
// decision is the constant ȳ, so predict returns that class.

use serde::{Deserialize, Serialize};

use crate::ir::tfidf::SparseVector;

const CG_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RidgeClassifier {
    pub alpha:     f64,
    pub weights:   Vec<f64>,
    pub intercept: f64,
}

impl RidgeClassifier {
    pub fn fit(rows: &[SparseVector], labels: &[bool], n_features: usize, alpha: f64) -> Self {
        let n = rows.len();
        if n == 0 {
            return Self { alpha, weights: vec![0.0; n_features], intercept: 0.0 };
        }

        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let y_mean      = y.iter().sum::<f64>() / n as f64;

        let mut mu = vec![0.0; n_features];
        for row in rows {
            for &(j, v) in row {
                mu[j] += v;
            }
        }
        mu.iter_mut().for_each(|m| *m /= n as f64);

        let residual: Vec<f64> = y.iter().map(|yi| yi - y_mean).collect();
        let rhs = xt_times(rows, &residual, n_features);

        let apply = |v: &[f64]| -> Vec<f64> {
            let xv     = x_times(rows, v);
            let mut av = xt_times(rows, &xv, n_features);
            let mu_v   = dot(&mu, v) * n as f64;
            for j in 0..n_features {
                av[j] += alpha * v[j] - mu_v * mu[j];
            }
            av
        };
        let weights   = conjugate_gradient(apply, &rhs, n_features.max(1) * 2);
        let intercept = y_mean - dot(&mu, &weights);

        Self { alpha, weights, intercept }
    }

    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        x.iter()
            .filter_map(|&(j, v)| self.weights.get(j).map(|w| w * v))
            .sum::<f64>()
            + self.intercept
    }

    pub fn predict(&self, x: &SparseVector) -> bool {
        self.decision_function(x) > 0.0
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// X v, one entry per row
fn x_times(rows: &[SparseVector], v: &[f64]) -> Vec<f64> {
    rows.iter()
        .map(|row| row.iter().map(|&(j, x)| x * v[j]).sum())
        .collect()
}

/// Xᵀ u, one entry per feature
fn xt_times(rows: &[SparseVector], u: &[f64], n_features: usize) -> Vec<f64> {
    let mut out = vec![0.0; n_features];
    for (row, &ui) in rows.iter().zip(u) {
        for &(j, x) in row {
            out[j] += x * ui;
        }
    }
    out
}

/// Solve A x = b for symmetric positive-definite A given as a closure
fn conjugate_gradient<F>(apply: F, b: &[f64], max_iter: usize) -> Vec<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let mut x = vec![0.0; b.len()];
    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rs_old = dot(&r, &r);
    let threshold  = CG_TOLERANCE * CG_TOLERANCE * rs_old.max(f64::MIN_POSITIVE);

    for _ in 0..max_iter {
        if rs_old <= threshold {
            break;
        }
        let ap    = apply(&p);
        let alpha = rs_old / dot(&p, &ap);
        for i in 0..x.len() {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        let rs_new = dot(&r, &r);
        let beta   = rs_new / rs_old;
        for i in 0..p.len() {
            p[i] = r[i] + beta * p[i];
        }
        rs_old = rs_new;
    }
    x
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<SparseVector> {
        vec![
            vec![(0, 1.0)],
            vec![(0, 0.8), (2, 0.6)],
            vec![(1, 1.0)],
            vec![(1, 0.6), (2, 0.8)],
        ]
    }

    #[test]
    fn test_separable_data() {
        let labels = [true, true, false, false];
        let model  = RidgeClassifier::fit(&rows(), &labels, 3, 1.0);
        for (row, &label) in rows().iter().zip(&labels) {
            assert_eq!(model.predict(row), label);
        }
        assert!(model.weights[0] > 0.0);
        assert!(model.weights[1] < 0.0);
    }

    #[test]
    fn test_matches_closed_form_one_feature() {
        // x = [1, 0], y = [+1, -1]: centred x = [.5, -.5], centred y = [1, -1]
        // w = Σx̃ỹ / (Σx̃² + alpha) = 1 / (0.5 + 1), b = 0 - 0.5·w
        let rows  = vec![vec![(0, 1.0)], vec![]];
        let model = RidgeClassifier::fit(&rows, &[true, false], 1, 1.0);
        assert!((model.weights[0] - 2.0 / 3.0).abs() < 1e-9);
        assert!((model.intercept + 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let all_true  = RidgeClassifier::fit(&rows(), &[true; 4], 3, 1.0);
        let all_false = RidgeClassifier::fit(&rows(), &[false; 4], 3, 1.0);
        for row in rows().iter().chain(std::iter::once(&vec![])) {
            assert!(all_true.predict(row));
            assert!(!all_false.predict(row));
        }
    }

    #[test]
    fn test_no_features_predicts_majority() {
        let rows  = vec![vec![], vec![], vec![]];
        let model = RidgeClassifier::fit(&rows, &[true, true, false], 0, 1.0);
        assert!(model.predict(&vec![]));
        assert!(model.predict(&vec![(5, 1.0)]));
    }

    #[test]
    fn test_deterministic() {
        let labels = [true, false, true, false];
        let a = RidgeClassifier::fit(&rows(), &labels, 3, 1.0);
        let b = RidgeClassifier::fit(&rows(), &labels, 3, 1.0);
        assert_eq!(a, b);
    }
}
